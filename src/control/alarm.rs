//! Alert transition policy.
//!
//! Applied once per sensor scan, per quantity, in a fixed order
//! (Temperature → Humidity → CO2) so that Humidity's cross-quantity
//! suspension check sees Temperature's freshly computed state.
//!
//! ```text
//!              ┌──[value < low]──▶ LOW ──[value ≥ mid]─────────▶ IDLE
//!              │                   │
//!   IDLE ──────┤                   ├─[actuation stalled]──▶ LOW_NO_EFFECT
//!              │                   │        (humidity: LOW_SUSPENDED
//!              │                   │         while temp/CO2 vent)
//!              └──[value > high    │
//!                  & > outdoor]──▶ HIGH  (mirrored on the high side)
//!
//!   *_NO_EFFECT ──[cooldown elapsed]──▶ re-evaluate thresholds
//! ```
//!
//! The low/high thresholds are user-set numbers, so plain comparisons
//! suffice there; every comparison against the *outdoor* reading goes
//! through the tolerance comparator — two noisy sensors must never be
//! treated as strictly ordered.  An absent outdoor sensor reads as
//! zero, which the `< 1` guards treat as "no outdoor data".

use heapless::Vec;
use log::debug;

use crate::alerts::{Alert, AlertBank, AlertState, AlertTransition};
use crate::config::GreenhouseConfig;
use crate::control::predictor::Predictor;
use crate::devices::{DeviceBank, DeviceId};
use crate::quantity::Quantity;
use crate::sensors::{Location, SensorHub};

/// Transitions accepted in one evaluation pass (at most one per
/// quantity).
pub type Transitions = Vec<AlertTransition, { Quantity::COUNT }>;

/// Read-only inputs to one evaluation pass.
pub struct AlarmInputs<'a> {
    pub cfg: &'a GreenhouseConfig,
    pub hub: &'a SensorHub,
    pub devices: &'a DeviceBank,
    pub now_ms: u64,
}

/// Run the transition rules for all three quantities.
///
/// Control-disabled or sensor-invalid quantities are forced to `Idle`.
/// A humidity `Low` episode that closes here reports its observed
/// outcome to the wetting `predictor`.
pub fn evaluate(
    alerts: &mut AlertBank,
    predictor: &mut Predictor,
    inp: &AlarmInputs<'_>,
) -> Transitions {
    let mut out = Transitions::new();

    // Temperature.
    let next = if inp.cfg.temperature.enabled && inp.hub.is_valid(Quantity::Temperature) {
        temperature_next(alerts.get(Quantity::Temperature), inp)
    } else {
        Some(AlertState::Idle)
    };
    apply(alerts, Quantity::Temperature, next, inp, &mut out);

    // Humidity sees Temperature's fresh state and CO2's previous one.
    let peers_venting = alerts.get(Quantity::Temperature).state_is(AlertState::High)
        || alerts.get(Quantity::Co2).state_is(AlertState::High);
    let next = if inp.cfg.humidity.enabled && inp.hub.is_valid(Quantity::Humidity) {
        humidity_next(alerts.get(Quantity::Humidity), peers_venting, predictor, inp)
    } else {
        Some(AlertState::Idle)
    };
    apply(alerts, Quantity::Humidity, next, inp, &mut out);

    // CO2.
    let next = if inp.cfg.co2.enabled && inp.hub.is_valid(Quantity::Co2) {
        co2_next(alerts.get(Quantity::Co2), inp)
    } else {
        Some(AlertState::Idle)
    };
    apply(alerts, Quantity::Co2, next, inp, &mut out);

    out
}

fn apply(
    alerts: &mut AlertBank,
    quantity: Quantity,
    next: Option<AlertState>,
    inp: &AlarmInputs<'_>,
    out: &mut Transitions,
) {
    let Some(state) = next else {
        return;
    };

    let value = inp.hub.reading(quantity, Location::Inner).value();
    if let Some(transition) = alerts.get_mut(quantity).set_state(state, value, inp.now_ms) {
        // Capacity is one slot per quantity; push cannot fail.
        let _ = out.push(transition);
    }
}

// ───────────────────────────────────────────────────────────────
// Temperature
// ───────────────────────────────────────────────────────────────

fn temperature_next(alert: &Alert, inp: &AlarmInputs<'_>) -> Option<AlertState> {
    let t = &inp.cfg.temperature;
    let indoor = inp.hub.reading(Quantity::Temperature, Location::Inner);
    let outdoor = inp.hub.reading(Quantity::Temperature, Location::Outer);
    let value = indoor.value();
    let mid = (t.alarm_low + t.alarm_high) / 2.0;
    let now = inp.now_ms;

    let over_high =
        value > t.alarm_high && (outdoor.value() < 1.0 || indoor.is_greater_than(outdoor));

    match alert.state() {
        AlertState::Idle => {
            if value < t.alarm_low {
                return Some(AlertState::Low);
            }
            if over_high {
                return Some(AlertState::High);
            }
            None
        }

        AlertState::Low => {
            if value >= mid {
                return Some(AlertState::Idle);
            }
            let heater = inp.devices.get(DeviceId::Heater);
            if !heater.is_active()
                && !indoor.is_up(now, 0)
                && indoor.up_by() < t.heater.effective_threshold
            {
                debug!("Temperature up by {:.2} — heating stalled", indoor.up_by());
                return Some(if value < t.alarm_low {
                    AlertState::LowNoEffect
                } else {
                    AlertState::Idle
                });
            }
            None
        }

        AlertState::High => {
            if value <= mid || (outdoor.value() > 0.0 && indoor.is_smaller_or_equal(outdoor)) {
                return Some(AlertState::Idle);
            }
            let fan = inp.devices.get(DeviceId::FanMain);
            if !fan.is_active()
                && !indoor.is_down(now, 0)
                && indoor.down_by() < t.fan.effective_threshold
            {
                debug!("Temperature down by {:.2} — venting stalled", indoor.down_by());
                return Some(if over_high {
                    AlertState::HighNoEffect
                } else {
                    AlertState::Idle
                });
            }
            None
        }

        AlertState::LowNoEffect => retry_after_cooldown(
            alert,
            t.heater.no_effect_delay_mins,
            now,
            value < t.alarm_low,
            AlertState::Low,
        ),

        AlertState::HighNoEffect => retry_after_cooldown(
            alert,
            t.fan.no_effect_delay_mins,
            now,
            over_high,
            AlertState::High,
        ),

        // Suspension is a humidity-only mechanism.
        AlertState::LowSuspended | AlertState::HighSuspended => None,
    }
}

// ───────────────────────────────────────────────────────────────
// Humidity
// ───────────────────────────────────────────────────────────────

fn humidity_next(
    alert: &Alert,
    peers_venting: bool,
    predictor: &mut Predictor,
    inp: &AlarmInputs<'_>,
) -> Option<AlertState> {
    let h = &inp.cfg.humidity;
    let indoor = inp.hub.reading(Quantity::Humidity, Location::Inner);
    let outdoor = inp.hub.reading(Quantity::Humidity, Location::Outer);
    let value = indoor.value();
    let mid = (h.alarm_low + h.alarm_high) / 2.0;
    let now = inp.now_ms;

    let over_high =
        value > h.alarm_high && (outdoor.value() < 1.0 || indoor.is_greater_than(outdoor));

    match alert.state() {
        AlertState::Idle => {
            if !peers_venting && value < h.alarm_low {
                return Some(AlertState::Low);
            }
            if over_high {
                return Some(AlertState::High);
            }
            None
        }

        AlertState::LowSuspended => {
            if value >= mid {
                return Some(AlertState::Idle);
            }
            if !peers_venting && value < h.alarm_low {
                return Some(AlertState::Low);
            }
            None
        }

        AlertState::Low => {
            if value >= mid {
                return Some(AlertState::Idle);
            }
            let humidifier = inp.devices.get(DeviceId::Humidifier);
            if !humidifier.is_active()
                && !indoor.is_up(now, 0)
                && indoor.up_by() < h.wetting.effective_threshold
                && indoor.down_by() < h.wetting.effective_threshold
            {
                // The wetting episode is over: report what the last run
                // actually achieved before leaving the state.
                let stat = &indoor.stat;
                if stat.valid {
                    predictor.put(stat.value_from, stat.value_to, humidifier.duration_ms(), true);
                    debug!(
                        "Humidity wetting outcome: {:.2} -> {:.2} in {} ms",
                        stat.value_from,
                        stat.value_to,
                        humidifier.duration_ms()
                    );
                }

                return Some(if peers_venting {
                    AlertState::LowSuspended
                } else if value < h.alarm_low {
                    AlertState::LowNoEffect
                } else {
                    AlertState::Idle
                });
            }
            None
        }

        AlertState::High => {
            if value <= mid || (outdoor.value() > 0.0 && indoor.is_smaller_or_equal(outdoor)) {
                return Some(AlertState::Idle);
            }
            let fan = inp.devices.get(DeviceId::FanMain);
            if !fan.is_active()
                && !indoor.is_down(now, 0)
                && indoor.down_by() < h.fan.effective_threshold
            {
                return Some(if over_high {
                    AlertState::HighNoEffect
                } else {
                    AlertState::Idle
                });
            }
            None
        }

        AlertState::LowNoEffect => retry_after_cooldown(
            alert,
            h.wetting.no_effect_delay_mins,
            now,
            value < h.alarm_low,
            AlertState::Low,
        ),

        AlertState::HighNoEffect => retry_after_cooldown(
            alert,
            h.fan.no_effect_delay_mins,
            now,
            over_high,
            AlertState::High,
        ),

        // Declared but never entered: only the low side is suspended
        // (wetting fights venting; venting fights nothing).
        AlertState::HighSuspended => None,
    }
}

// ───────────────────────────────────────────────────────────────
// CO2 — high side only; nothing in the box *adds* CO2
// ───────────────────────────────────────────────────────────────

fn co2_next(alert: &Alert, inp: &AlarmInputs<'_>) -> Option<AlertState> {
    let c = &inp.cfg.co2;
    let indoor = inp.hub.reading(Quantity::Co2, Location::Inner);
    let outdoor = inp.hub.reading(Quantity::Co2, Location::Outer);
    let value = indoor.value();
    let now = inp.now_ms;

    let over_high =
        value > c.alarm_high && (outdoor.value() < 1.0 || indoor.is_greater_than(outdoor));

    match alert.state() {
        AlertState::Idle => over_high.then_some(AlertState::High),

        AlertState::High => {
            // Recovery target is the threshold itself — no low side to
            // build a midpoint from.
            if value <= c.alarm_high
                || (outdoor.value() > 0.0 && indoor.is_smaller_or_equal(outdoor))
            {
                return Some(AlertState::Idle);
            }
            let fan = inp.devices.get(DeviceId::FanMain);
            if !fan.is_active()
                && !indoor.is_down(now, 0)
                && indoor.down_by() < c.fan.effective_threshold
            {
                return Some(if over_high {
                    AlertState::HighNoEffect
                } else {
                    AlertState::Idle
                });
            }
            None
        }

        AlertState::HighNoEffect => retry_after_cooldown(
            alert,
            c.fan.no_effect_delay_mins,
            now,
            over_high,
            AlertState::High,
        ),

        _ => None,
    }
}

/// `*NoEffect` holding pattern: once the configured cooldown has passed
/// since the episode closed, re-arm the alarm if the condition still
/// holds, else return to `Idle`.  A zero delay disables the retry.
fn retry_after_cooldown(
    alert: &Alert,
    delay_mins: u32,
    now_ms: u64,
    still_out_of_range: bool,
    rearm: AlertState,
) -> Option<AlertState> {
    if delay_mins == 0 {
        return None;
    }

    let stop_ms = alert.previous().map_or(0, |e| e.stop_ms);
    if now_ms.saturating_sub(stop_ms) > u64::from(delay_mins) * 60_000 {
        Some(if still_out_of_range { rearm } else { AlertState::Idle })
    } else {
        None
    }
}
