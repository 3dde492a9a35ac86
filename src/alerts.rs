//! Per-quantity alert state.
//!
//! An [`Alert`] records *what state the alarm is in*; the transition
//! rules that decide the next state live in
//! [`control::alarm`](crate::control::alarm).  Besides the current and
//! previous state, each alert keeps a single-slot record of the most
//! recently **closed** episode — one continuous span spent in an active
//! (`Low`/`High`) state.  The slot is overwritten on every close, never
//! accumulated; history belongs to the excluded UI layer.

use log::info;

use crate::quantity::Quantity;

/// Alarm states.  `Low`/`High` are the *active* states; the rest are
/// flavours of "not actively alarming".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AlertState {
    Idle = 0,
    Low = 1,
    High = 2,
    /// Corrective action was declared ineffective; waiting out the
    /// configured cooldown before re-arming.
    LowNoEffect = 3,
    HighNoEffect = 4,
    /// Humidity only: wetting would fight an active heat/CO2 venting
    /// alarm, so the low-humidity alarm is parked until that clears.
    LowSuspended = 5,
    HighSuspended = 6,
}

impl AlertState {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Low => "LOW",
            Self::High => "HIGH",
            Self::LowNoEffect => "LOW_NO_EFFECT",
            Self::HighNoEffect => "HIGH_NO_EFFECT",
            Self::LowSuspended => "LOW_SUSPENDED",
            Self::HighSuspended => "HIGH_SUSPENDED",
        }
    }

    /// An alarm is active only in `Low` or `High`.
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Low | Self::High)
    }
}

/// Display colour for an alert state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertColor {
    /// Value too low (any Low flavour).
    Blue,
    /// Value too high (any High flavour).
    Red,
    /// No alarm.
    LightGray,
}

impl AlertColor {
    /// 24-bit RGB value for UI layers.
    pub const fn rgb(self) -> u32 {
        match self {
            Self::Red => 0x00cb_2839,
            Self::Blue => 0x0029_7bcd,
            Self::LightGray => 0x00ac_acac,
        }
    }
}

/// The most recently closed alert episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosedEpisode {
    /// Active state the episode ran in (`Low` or `High`).
    pub start_state: AlertState,
    /// State the episode closed into.
    pub stop_state: AlertState,
    pub start_ms: u64,
    pub stop_ms: u64,
    pub start_value: f32,
    pub stop_value: f32,
}

/// A transition accepted by [`Alert::set_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertTransition {
    pub quantity: Quantity,
    pub from: AlertState,
    pub to: AlertState,
}

/// One quantity's alarm.
#[derive(Debug)]
pub struct Alert {
    quantity: Quantity,
    state: AlertState,
    state_prev: AlertState,

    /// Start of the running episode; zeroed while not active.
    start_ms: u64,
    start_value: f32,

    previous: Option<ClosedEpisode>,
}

impl Alert {
    pub fn new(quantity: Quantity) -> Self {
        Self {
            quantity,
            state: AlertState::Idle,
            state_prev: AlertState::Idle,
            start_ms: 0,
            start_value: 0.0,
            previous: None,
        }
    }

    /// Request a state change.
    ///
    /// Idempotent: requesting the current state is a no-op and returns
    /// `None`.  An accepted change maintains the episode bookkeeping —
    /// entering `Low`/`High` opens a fresh episode (and discards the
    /// previous record), leaving one closes it into the single slot.
    pub fn set_state(
        &mut self,
        state: AlertState,
        value: f32,
        now_ms: u64,
    ) -> Option<AlertTransition> {
        if self.state == state {
            return None;
        }

        match state {
            AlertState::Low | AlertState::High => {
                self.previous = None;
                self.start_ms = now_ms;
                self.start_value = value;
            }
            _ => {
                if self.state.is_active() {
                    self.previous = Some(ClosedEpisode {
                        start_state: self.state,
                        stop_state: state,
                        start_ms: self.start_ms,
                        stop_ms: now_ms,
                        start_value: self.start_value,
                        stop_value: value,
                    });
                    self.start_ms = 0;
                    self.start_value = 0.0;
                }
            }
        }

        self.state_prev = self.state;
        self.state = state;

        info!(
            "{} alert: {} -> {}",
            self.quantity.name(),
            self.state_prev.name(),
            self.state.name()
        );

        Some(AlertTransition {
            quantity: self.quantity,
            from: self.state_prev,
            to: self.state,
        })
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    pub fn state_prev(&self) -> AlertState {
        self.state_prev
    }

    pub fn state_is(&self, state: AlertState) -> bool {
        self.state == state
    }

    pub fn state_in(&self, states: &[AlertState]) -> bool {
        states.contains(&self.state)
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Start timestamp of the running episode (0 while not active).
    pub fn start_ms(&self) -> u64 {
        self.start_ms
    }

    /// Value at the start of the running episode.
    pub fn start_value(&self) -> f32 {
        self.start_value
    }

    /// The most recently closed episode, if any.
    pub fn previous(&self) -> Option<&ClosedEpisode> {
        self.previous.as_ref()
    }

    pub fn color(&self) -> AlertColor {
        match self.state {
            AlertState::Low | AlertState::LowNoEffect | AlertState::LowSuspended => {
                AlertColor::Blue
            }
            AlertState::High | AlertState::HighNoEffect | AlertState::HighSuspended => {
                AlertColor::Red
            }
            AlertState::Idle => AlertColor::LightGray,
        }
    }
}

/// Flat table of all three alerts, indexed by [`Quantity`].
#[derive(Debug)]
pub struct AlertBank {
    alerts: [Alert; Quantity::COUNT],
}

impl AlertBank {
    pub fn new() -> Self {
        Self {
            alerts: [
                Alert::new(Quantity::Temperature),
                Alert::new(Quantity::Humidity),
                Alert::new(Quantity::Co2),
            ],
        }
    }

    pub fn get(&self, quantity: Quantity) -> &Alert {
        &self.alerts[quantity as usize]
    }

    pub fn get_mut(&mut self, quantity: Quantity) -> &mut Alert {
        &mut self.alerts[quantity as usize]
    }
}

impl Default for AlertBank {
    fn default() -> Self {
        Self::new()
    }
}
