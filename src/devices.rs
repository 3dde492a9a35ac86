//! Timed actuator scheduling with ownership exclusivity.
//!
//! A [`Device`] is one relay-driven actuator.  Whichever alert source
//! starts it becomes its *owner*; start/stop requests from any other
//! source are silently ignored until the owner releases it.  That single
//! check is the whole mutual-exclusion story — there is exactly one
//! thread of control, only multiple logical requesters within one tick.
//!
//! The cycle machine, driven by [`Device::tick`]:
//!
//! ```text
//!   start ──▶ ON ──[duration]──▶ OFF ──[delay]──▶ loop check
//!               ▲                                    │
//!               └──────────[loops remaining]─────────┘
//!                         [loop limit / no duration] ──▶ stop
//!   any time: total-duration cap ──▶ stop
//! ```
//!
//! A start with no duration latches the device on until `stop`.

use log::info;

use crate::quantity::Quantity;

/// The four actuator outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DeviceId {
    /// Exhaust fan venting to the outside.
    FanMain = 0,
    /// Circulation fan inside the box.
    FanInner = 1,
    Heater = 2,
    Humidifier = 3,
}

impl DeviceId {
    pub const COUNT: usize = 4;

    pub const ALL: [Self; Self::COUNT] =
        [Self::FanMain, Self::FanInner, Self::Heater, Self::Humidifier];

    pub const fn name(self) -> &'static str {
        match self {
            Self::FanMain => "FanMain",
            Self::FanInner => "FanInner",
            Self::Heater => "Heater",
            Self::Humidifier => "Humidifier",
        }
    }
}

/// The humidifier's mist output lags the relay by about a second.
pub const HUMIDIFIER_HARDWARE_DELAY_MS: u64 = 1000;

/// One-shot millisecond deadline.
#[derive(Debug, Default, Clone, Copy)]
struct OneShot(Option<u64>);

impl OneShot {
    fn arm(&mut self, now_ms: u64, after_ms: u64) {
        self.0 = Some(now_ms.saturating_add(after_ms));
    }

    fn cancel(&mut self) {
        self.0 = None;
    }

    /// Fires at most once per arm.
    fn ready(&mut self, now_ms: u64) -> bool {
        match self.0 {
            Some(deadline) if now_ms >= deadline => {
                self.0 = None;
                true
            }
            _ => false,
        }
    }
}

/// One actuator output with its timed-cycle state.
#[derive(Debug)]
pub struct Device {
    id: DeviceId,

    /// Compensates actuator lag: added to the armed duration so the
    /// effective on-time matches the request once output is physical.
    hardware_delay_ms: u64,

    duration_ms: u64,
    delay_ms: u64,
    total_duration_ms: u64,
    loop_count: u32,
    loop_num: u32,

    duration_timer: OneShot,
    delay_timer: OneShot,

    owner: Option<Quantity>,
    active: bool,
    on: bool,

    active_change_ms: u64,
    state_change_ms: u64,
}

impl Device {
    pub fn new(id: DeviceId, hardware_delay_ms: u64) -> Self {
        Self {
            id,
            hardware_delay_ms,
            duration_ms: 0,
            delay_ms: 0,
            total_duration_ms: 0,
            loop_count: 0,
            loop_num: 0,
            duration_timer: OneShot::default(),
            delay_timer: OneShot::default(),
            owner: None,
            active: false,
            on: false,
            active_change_ms: 0,
            state_change_ms: 0,
        }
    }

    /// Start a timed cycle (all times in ms, zero = unused).
    ///
    /// Ignored while active under a different owner.  A same-owner call
    /// on an active device updates the cycle parameters in place; the
    /// duration timer is only (re)armed when the duration is upgraded
    /// from zero — an in-flight cycle keeps its deadline.
    pub fn start(
        &mut self,
        owner: Quantity,
        duration_ms: u64,
        delay_ms: u64,
        loop_count: u32,
        total_duration_ms: u64,
        now_ms: u64,
    ) {
        if self.active && self.owner != Some(owner) {
            return;
        }

        let old_duration = self.duration_ms;

        self.duration_ms = if duration_ms > 0 {
            duration_ms + self.hardware_delay_ms
        } else {
            0
        };
        self.delay_ms = delay_ms;
        self.loop_count = loop_count;
        self.total_duration_ms = total_duration_ms;
        self.loop_num = 0;

        if self.active {
            if old_duration < 1 && self.duration_ms > 0 {
                self.duration_timer.arm(now_ms, self.duration_ms);
            }
            return;
        }

        info!("{}.start (owner {})", self.id.name(), owner.name());

        self.owner = Some(owner);
        self.turn_on(now_ms);
        self.active_change_ms = now_ms;
        self.active = true;

        if self.duration_ms > 0 {
            self.duration_timer.arm(now_ms, self.duration_ms);
        }
    }

    /// Start with no cycle: on until the owner stops it.
    pub fn hold(&mut self, owner: Quantity, now_ms: u64) {
        self.start(owner, 0, 0, 0, 0, now_ms);
    }

    /// Stop the device.  Idempotent; ignored unless `owner` matches.
    pub fn stop(&mut self, owner: Quantity, now_ms: u64) {
        if !self.active || self.owner != Some(owner) {
            return;
        }

        self.duration_timer.cancel();
        self.delay_timer.cancel();

        info!("{}.stop (owner {})", self.id.name(), owner.name());

        self.turn_off(now_ms);
        self.active_change_ms = now_ms;
        self.active = false;
        self.owner = None;
    }

    /// Advance the cycle machine.  Call once per control-loop pass.
    pub fn tick(&mut self, now_ms: u64) {
        if self.active
            && self.total_duration_ms > 0
            && self.millis_passed(now_ms) > self.total_duration_ms
        {
            self.force_stop(now_ms);
            return;
        }

        if self.duration_timer.ready(now_ms) {
            self.turn_off(now_ms);
            if self.delay_ms > 0 {
                self.delay_timer.arm(now_ms, self.delay_ms);
            } else {
                self.force_stop(now_ms);
                return;
            }
        }

        if self.delay_timer.ready(now_ms) {
            if self.loop_count > 0 {
                self.loop_num += 1;
                if self.loop_num >= self.loop_count {
                    self.force_stop(now_ms);
                    return;
                }
            }

            if self.duration_ms > 0 {
                self.turn_on(now_ms);
                self.duration_timer.arm(now_ms, self.duration_ms);
            } else {
                self.force_stop(now_ms);
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// A cycle is running (the relay itself may be in an off phase).
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Relay state right now.
    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn owner(&self) -> Option<Quantity> {
        self.owner
    }

    /// Configured on-phase length, without the hardware compensation.
    pub fn duration_ms(&self) -> u64 {
        if self.duration_ms > self.hardware_delay_ms {
            self.duration_ms - self.hardware_delay_ms
        } else {
            self.duration_ms
        }
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    /// Milliseconds since the cycle last started or stopped.  Only
    /// meaningful while a cycle is active (callers gate on
    /// [`is_active`](Self::is_active)).
    pub fn millis_passed(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.active_change_ms)
    }

    /// Timestamp of the last relay flip.
    pub fn state_change_ms(&self) -> u64 {
        self.state_change_ms
    }

    // ── Internal ──────────────────────────────────────────────

    fn force_stop(&mut self, now_ms: u64) {
        if let Some(owner) = self.owner {
            self.stop(owner, now_ms);
        }
    }

    fn turn_on(&mut self, now_ms: u64) {
        if self.on {
            return;
        }
        self.on = true;
        self.state_change_ms = now_ms;
    }

    fn turn_off(&mut self, now_ms: u64) {
        if !self.on {
            return;
        }
        self.on = false;
        self.state_change_ms = now_ms;
    }
}

/// Flat table of all four devices, indexed by [`DeviceId`].
#[derive(Debug)]
pub struct DeviceBank {
    devices: [Device; DeviceId::COUNT],
}

impl DeviceBank {
    pub fn new() -> Self {
        Self {
            devices: [
                Device::new(DeviceId::FanMain, 0),
                Device::new(DeviceId::FanInner, 0),
                Device::new(DeviceId::Heater, 0),
                Device::new(DeviceId::Humidifier, HUMIDIFIER_HARDWARE_DELAY_MS),
            ],
        }
    }

    pub fn get(&self, id: DeviceId) -> &Device {
        &self.devices[id as usize]
    }

    pub fn get_mut(&mut self, id: DeviceId) -> &mut Device {
        &mut self.devices[id as usize]
    }

    /// Run every device's cycle machine.
    pub fn tick_all(&mut self, now_ms: u64) {
        for device in &mut self.devices {
            device.tick(now_ms);
        }
    }
}

impl Default for DeviceBank {
    fn default() -> Self {
        Self::new()
    }
}
