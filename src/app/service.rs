//! Application service — the hexagonal core.
//!
//! [`Regulator`] owns the sensor hub, alert bank, device bank and the
//! wetting predictor, and exposes a clean, hardware-agnostic API.  All
//! I/O flows through port traits injected at call sites, making the
//! entire service testable with mock adapters.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                 │          Regulator           │
//!   RelayPort ◀── │ Readings · Alerts · Devices  │ ◀─▶ ProfilePort
//!                 │        · Predictor           │
//!                 └──────────────────────────────┘
//! ```
//!
//! Within one scan the pipeline order is a correctness requirement, not
//! a preference: readings refresh strictly before alerts re-evaluate,
//! alerts before devices are commanded, devices before the predictor
//! receives feedback — each stage consumes the previous stage's freshly
//! computed output.

use log::{info, warn};

use crate::alerts::{AlertBank, AlertColor, AlertState};
use crate::config::GreenhouseConfig;
use crate::control::alarm::{self, AlarmInputs};
use crate::control::predictor::Predictor;
use crate::devices::{DeviceBank, DeviceId};
use crate::error::Result;
use crate::quantity::Quantity;
use crate::sensors::{Location, SensorHub};

use super::events::AppEvent;
use super::ports::{EventSink, ProfilePort, RelayPort, SensorPort, StorageError};

/// A device is not re-armed while the value has already been moving the
/// right way within this window.
const TREND_WINDOW_MS: u64 = 5000;

/// Wetting aims at most this far above the current humidity per pulse;
/// small steps keep the learned-efficiency samples honest.
const WETTING_TARGET_STEP: f32 = 3.0;

/// The regulator core: one instance drives the whole system.
pub struct Regulator {
    cfg: GreenhouseConfig,
    hub: SensorHub,
    alerts: AlertBank,
    devices: DeviceBank,
    /// Humidity is the only quantity with a learned actuator model; the
    /// mechanism itself is quantity-agnostic.
    wetting: Predictor,

    last_scan_ms: u64,
    scanned_once: bool,

    /// Last relay states pushed through the port (edge detection).
    applied_relay: [bool; DeviceId::COUNT],
    /// Last cycle-active states reported (edge detection).
    reported_active: [bool; DeviceId::COUNT],
    /// Last sensor-validity states reported (edge detection).
    reported_valid: [bool; Quantity::COUNT],

    last_profile_save_ms: u64,
}

impl Regulator {
    pub fn new(cfg: GreenhouseConfig) -> Self {
        let hub = SensorHub::new(&cfg);
        let wetting = Predictor::new(
            5.0, // humidity % per bucket
            cfg.humidity.predict_min_ms,
            cfg.humidity.predict_max_ms,
        );

        Self {
            hub,
            wetting,
            cfg,
            alerts: AlertBank::new(),
            devices: DeviceBank::new(),
            last_scan_ms: 0,
            scanned_once: false,
            applied_relay: [false; DeviceId::COUNT],
            reported_active: [false; DeviceId::COUNT],
            reported_valid: [false; Quantity::COUNT],
            last_profile_save_ms: 0,
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control-loop pass.
    ///
    /// Called at main-loop cadence; the sensor scan pipeline runs at
    /// the configured scan interval, while device cycle timers and
    /// relay synchronisation run every call.
    pub fn tick(
        &mut self,
        now_ms: u64,
        hw: &mut (impl SensorPort + RelayPort),
        sink: &mut impl EventSink,
    ) {
        if self.scan_due(now_ms) {
            self.last_scan_ms = now_ms;
            self.scanned_once = true;

            // 1. Readings.
            self.hub.update_all(now_ms, hw);
            self.publish_validity(sink);

            // 2. Alerts.
            let inputs = AlarmInputs {
                cfg: &self.cfg,
                hub: &self.hub,
                devices: &self.devices,
                now_ms,
            };
            let transitions = alarm::evaluate(&mut self.alerts, &mut self.wetting, &inputs);
            for t in &transitions {
                sink.emit(&AppEvent::AlertChanged {
                    quantity: t.quantity,
                    from: t.from,
                    to: t.to,
                });
            }

            // 3. Stat accumulation tracks alarm episodes only.
            self.update_stat_gates();

            // 4. Devices follow the alert states.
            self.drive_devices(now_ms);
        }

        // Cycle timers and hardware/event synchronisation run every
        // pass so pulse edges don't wait for the next scan.
        self.devices.tick_all(now_ms);
        self.publish_device_changes(hw, sink);
    }

    fn scan_due(&self, now_ms: u64) -> bool {
        !self.scanned_once
            || now_ms.saturating_sub(self.last_scan_ms) >= self.cfg.sensor_scan_interval_ms
    }

    /// Trend statistics cost memory and only mean anything while an
    /// alarm is in flight.
    fn update_stat_gates(&mut self) {
        let temperature_active = self
            .alerts
            .get(Quantity::Temperature)
            .state_in(&[AlertState::Low, AlertState::High]);
        let humidity_active = self
            .alerts
            .get(Quantity::Humidity)
            .state_in(&[AlertState::Low, AlertState::High]);
        let co2_active = self.alerts.get(Quantity::Co2).state_is(AlertState::High);

        self.hub
            .set_stat_enabled(Quantity::Temperature, temperature_active);
        self.hub.set_stat_enabled(Quantity::Humidity, humidity_active);
        self.hub.set_stat_enabled(Quantity::Co2, co2_active);
    }

    /// Map alert states onto device commands.  The inner fan circulates
    /// air during any active alarm; the heavy actuators pulse with
    /// configured (or predicted) timings.
    fn drive_devices(&mut self, now_ms: u64) {
        // ── Temperature ───────────────────────────────────────
        match self.alerts.get(Quantity::Temperature).state() {
            AlertState::High => {
                self.devices
                    .get_mut(DeviceId::FanInner)
                    .hold(Quantity::Temperature, now_ms);

                let falling = self
                    .hub
                    .reading(Quantity::Temperature, Location::Inner)
                    .is_down(now_ms, TREND_WINDOW_MS);
                if !self.devices.get(DeviceId::FanMain).is_active() && !falling {
                    self.hub
                        .reading_mut(Quantity::Temperature, Location::Inner)
                        .stat
                        .reload();
                    let fan = &self.cfg.temperature.fan;
                    self.devices.get_mut(DeviceId::FanMain).start(
                        Quantity::Temperature,
                        fan.duration_ms,
                        fan.delay_ms,
                        1,
                        0,
                        now_ms,
                    );
                }
            }

            AlertState::Low => {
                let rising = self
                    .hub
                    .reading(Quantity::Temperature, Location::Inner)
                    .is_up(now_ms, TREND_WINDOW_MS);
                if !self.devices.get(DeviceId::Heater).is_active() && !rising {
                    self.hub
                        .reading_mut(Quantity::Temperature, Location::Inner)
                        .stat
                        .reload();
                    let heater = &self.cfg.temperature.heater;
                    self.devices.get_mut(DeviceId::Heater).start(
                        Quantity::Temperature,
                        heater.duration_ms,
                        heater.delay_ms,
                        1,
                        0,
                        now_ms,
                    );
                }
            }

            _ => {
                self.devices
                    .get_mut(DeviceId::FanMain)
                    .stop(Quantity::Temperature, now_ms);
                self.devices
                    .get_mut(DeviceId::Heater)
                    .stop(Quantity::Temperature, now_ms);
                self.devices
                    .get_mut(DeviceId::FanInner)
                    .stop(Quantity::Temperature, now_ms);
            }
        }

        // ── Humidity ──────────────────────────────────────────
        match self.alerts.get(Quantity::Humidity).state() {
            AlertState::High => {
                self.devices
                    .get_mut(DeviceId::FanInner)
                    .hold(Quantity::Humidity, now_ms);

                let falling = self
                    .hub
                    .reading(Quantity::Humidity, Location::Inner)
                    .is_down(now_ms, TREND_WINDOW_MS);
                if !self.devices.get(DeviceId::FanMain).is_active() && !falling {
                    self.hub
                        .reading_mut(Quantity::Humidity, Location::Inner)
                        .stat
                        .reload();
                    let fan = &self.cfg.humidity.fan;
                    self.devices.get_mut(DeviceId::FanMain).start(
                        Quantity::Humidity,
                        fan.duration_ms,
                        fan.delay_ms,
                        1,
                        0,
                        now_ms,
                    );
                }
            }

            AlertState::Low => {
                self.devices
                    .get_mut(DeviceId::FanInner)
                    .hold(Quantity::Humidity, now_ms);

                let rising = self
                    .hub
                    .reading(Quantity::Humidity, Location::Inner)
                    .is_up(now_ms, TREND_WINDOW_MS);
                if !self.devices.get(DeviceId::Humidifier).is_active() && !rising {
                    self.start_wetting_pulse(now_ms);
                }
            }

            _ => {
                self.devices
                    .get_mut(DeviceId::FanMain)
                    .stop(Quantity::Humidity, now_ms);
                self.devices
                    .get_mut(DeviceId::Humidifier)
                    .stop(Quantity::Humidity, now_ms);
                self.devices
                    .get_mut(DeviceId::FanInner)
                    .stop(Quantity::Humidity, now_ms);
            }
        }

        // ── CO2 ───────────────────────────────────────────────
        match self.alerts.get(Quantity::Co2).state() {
            AlertState::High => {
                self.devices
                    .get_mut(DeviceId::FanInner)
                    .hold(Quantity::Co2, now_ms);

                let falling = self
                    .hub
                    .reading(Quantity::Co2, Location::Inner)
                    .is_down(now_ms, TREND_WINDOW_MS);
                if !self.devices.get(DeviceId::FanMain).is_active() && !falling {
                    self.hub
                        .reading_mut(Quantity::Co2, Location::Inner)
                        .stat
                        .reload();
                    let fan = &self.cfg.co2.fan;
                    self.devices.get_mut(DeviceId::FanMain).start(
                        Quantity::Co2,
                        fan.duration_ms,
                        fan.delay_ms,
                        1,
                        0,
                        now_ms,
                    );
                }
            }

            _ => {
                self.devices
                    .get_mut(DeviceId::FanMain)
                    .stop(Quantity::Co2, now_ms);
                self.devices
                    .get_mut(DeviceId::FanInner)
                    .stop(Quantity::Co2, now_ms);
            }
        }
    }

    /// Start one predictor-sized humidifier pulse.
    ///
    /// The previous pulse's outcome is reported first, then the trend
    /// window restarts so the next outcome measures only the new pulse.
    fn start_wetting_pulse(&mut self, now_ms: u64) {
        let humidifier_duration = self.devices.get(DeviceId::Humidifier).duration_ms();
        let reading = self
            .hub
            .reading_mut(Quantity::Humidity, Location::Inner);

        if reading.stat.valid {
            self.wetting.put(
                reading.stat.value_from,
                reading.stat.value_to,
                humidifier_duration,
                true,
            );
        }
        reading.stat.reload();

        let value = reading.value();
        let mid = (self.cfg.humidity.alarm_low + self.cfg.humidity.alarm_high) / 2.0;
        let step = (mid - value).min(WETTING_TARGET_STEP);

        let mut run_ms = self.wetting.predict(value, value + step);
        if run_ms < 1 {
            run_ms = self.cfg.humidity.wetting.duration_ms;
        }
        info!("wetting pulse: {run_ms} ms toward {:.1}", value + step);

        self.devices.get_mut(DeviceId::Humidifier).start(
            Quantity::Humidity,
            run_ms,
            self.cfg.humidity.wetting.delay_ms,
            1,
            0,
            now_ms,
        );
    }

    /// Push relay edges to hardware and report cycle edges.
    fn publish_device_changes(&mut self, hw: &mut impl RelayPort, sink: &mut impl EventSink) {
        for id in DeviceId::ALL {
            let idx = id as usize;
            let device = self.devices.get(id);

            let on = device.is_on();
            if on != self.applied_relay[idx] {
                self.applied_relay[idx] = on;
                hw.set_relay(id, on);
                sink.emit(&AppEvent::DeviceSwitched { device: id, on });
            }

            let active = device.is_active();
            if active != self.reported_active[idx] {
                self.reported_active[idx] = active;
                sink.emit(&AppEvent::DeviceActive { device: id, active });
            }
        }
    }

    fn publish_validity(&mut self, sink: &mut impl EventSink) {
        for quantity in Quantity::ALL {
            let valid = self.hub.is_valid(quantity);
            if valid != self.reported_valid[quantity as usize] {
                self.reported_valid[quantity as usize] = valid;
                sink.emit(&AppEvent::SensorValidity { quantity, valid });
            }
        }
    }

    // ── Learned-profile persistence ───────────────────────────

    /// Seed the predictor from storage.  A missing profile is a normal
    /// first boot, not an error.
    pub fn load_profiles(&mut self, store: &impl ProfilePort) -> Result<()> {
        match store.load(Quantity::Humidity) {
            Ok(profile) => {
                self.wetting.load_profile(&profile);
                info!("wetting efficiency profile loaded");
                Ok(())
            }
            Err(StorageError::NotFound) => Ok(()),
            Err(e) => {
                warn!("wetting profile load failed: {e}");
                Err(e.into())
            }
        }
    }

    /// Persist dirty predictor tables at the configured interval.
    /// Returns `true` if a save happened.  Storage failure is reported
    /// and retried next interval; it never blocks the control tick.
    pub fn maybe_save_profiles(&mut self, now_ms: u64, store: &mut impl ProfilePort) -> bool {
        if !self.wetting.is_dirty() {
            return false;
        }
        if self.last_profile_save_ms > 0
            && now_ms.saturating_sub(self.last_profile_save_ms)
                < self.cfg.profile_save_interval_ms
        {
            return false;
        }

        self.last_profile_save_ms = now_ms;
        match store.save(Quantity::Humidity, &self.wetting.profile()) {
            Ok(()) => {
                self.wetting.mark_saved();
                info!("wetting efficiency profile saved");
                true
            }
            Err(e) => {
                warn!("wetting profile save failed: {e}");
                false
            }
        }
    }

    // ── Read-only accessors (display layer) ───────────────────

    /// Current smoothed indoor value for a quantity.
    pub fn current_value(&self, quantity: Quantity) -> f32 {
        self.hub.reading(quantity, Location::Inner).value()
    }

    /// Whether the indoor sensor behind a quantity currently reads.
    pub fn is_valid(&self, quantity: Quantity) -> bool {
        self.hub.is_valid(quantity)
    }

    pub fn alert_state(&self, quantity: Quantity) -> AlertState {
        self.alerts.get(quantity).state()
    }

    pub fn alert_color(&self, quantity: Quantity) -> AlertColor {
        self.alerts.get(quantity).color()
    }

    pub fn device_running(&self, device: DeviceId) -> bool {
        self.devices.get(device).is_active()
    }

    /// Milliseconds the device's current cycle has been running.
    pub fn device_duty_elapsed(&self, device: DeviceId, now_ms: u64) -> u64 {
        let device = self.devices.get(device);
        if device.is_active() {
            device.millis_passed(now_ms)
        } else {
            0
        }
    }

    /// Clone of the live configuration (for display or delta updates).
    pub fn current_config(&self) -> GreenhouseConfig {
        self.cfg.clone()
    }

    // ── Runtime setters (config/UI layer) ─────────────────────

    pub fn set_control_enabled(&mut self, quantity: Quantity, enabled: bool) {
        match quantity {
            Quantity::Temperature => self.cfg.temperature.enabled = enabled,
            Quantity::Humidity => self.cfg.humidity.enabled = enabled,
            Quantity::Co2 => self.cfg.co2.enabled = enabled,
        }
        info!("{} control enabled = {enabled}", quantity.name());
    }

    /// Alarm thresholds.  CO2 ignores the low value (it has no low
    /// side).
    pub fn set_thresholds(&mut self, quantity: Quantity, low: f32, high: f32) {
        match quantity {
            Quantity::Temperature => {
                self.cfg.temperature.alarm_low = low;
                self.cfg.temperature.alarm_high = high;
            }
            Quantity::Humidity => {
                self.cfg.humidity.alarm_low = low;
                self.cfg.humidity.alarm_high = high;
            }
            Quantity::Co2 => self.cfg.co2.alarm_high = high,
        }
    }

    /// Change-detection hysteresis, propagated to both readings.
    pub fn set_hysteresis(&mut self, quantity: Quantity, value: f32) {
        match quantity {
            Quantity::Temperature => self.cfg.temperature.hysteresis = value,
            Quantity::Humidity => self.cfg.humidity.hysteresis = value,
            Quantity::Co2 => self.cfg.co2.hysteresis = value,
        }
        self.hub
            .reading_mut(quantity, Location::Inner)
            .set_hysteresis(value);
        self.hub
            .reading_mut(quantity, Location::Outer)
            .set_hysteresis(value);
    }

    /// Calibration offset for the outdoor reading.
    pub fn set_offset(&mut self, quantity: Quantity, offset: f32) {
        match quantity {
            Quantity::Temperature => self.cfg.temperature.offset = offset,
            Quantity::Humidity => self.cfg.humidity.offset = offset,
            Quantity::Co2 => self.cfg.co2.offset = offset,
        }
        self.hub
            .reading_mut(quantity, Location::Outer)
            .set_offset(offset);
    }

    /// Smoothing window size for both readings.  Destructive: resets
    /// the accumulated windows.
    pub fn set_smoothing_window(&mut self, quantity: Quantity, size: usize) {
        match quantity {
            Quantity::Temperature => self.cfg.temperature.smoothing_window = size,
            Quantity::Humidity => self.cfg.humidity.smoothing_window = size,
            Quantity::Co2 => self.cfg.co2.smoothing_window = size,
        }
        self.hub
            .reading_mut(quantity, Location::Inner)
            .set_smoothing_window(size);
        self.hub
            .reading_mut(quantity, Location::Outer)
            .set_smoothing_window(size);
    }

    /// Per-channel actuation timings (device timing setters of the
    /// external interface).
    pub fn set_fan_timing(&mut self, quantity: Quantity, duration_ms: u64, delay_ms: u64) {
        let fan = match quantity {
            Quantity::Temperature => &mut self.cfg.temperature.fan,
            Quantity::Humidity => &mut self.cfg.humidity.fan,
            Quantity::Co2 => &mut self.cfg.co2.fan,
        };
        fan.duration_ms = duration_ms;
        fan.delay_ms = delay_ms;
    }

    pub fn set_heater_timing(&mut self, duration_ms: u64, delay_ms: u64) {
        self.cfg.temperature.heater.duration_ms = duration_ms;
        self.cfg.temperature.heater.delay_ms = delay_ms;
    }

    pub fn set_wetting_timing(&mut self, duration_ms: u64, delay_ms: u64) {
        self.cfg.humidity.wetting.duration_ms = duration_ms;
        self.cfg.humidity.wetting.delay_ms = delay_ms;
    }

    /// Effectiveness criteria for the venting channel: the minimum
    /// observed movement for the fan to count as working, and the
    /// cooldown before an ineffective run is retried.
    pub fn set_fan_effectiveness(
        &mut self,
        quantity: Quantity,
        effective_threshold: f32,
        no_effect_delay_mins: u32,
    ) {
        let fan = match quantity {
            Quantity::Temperature => &mut self.cfg.temperature.fan,
            Quantity::Humidity => &mut self.cfg.humidity.fan,
            Quantity::Co2 => &mut self.cfg.co2.fan,
        };
        fan.effective_threshold = effective_threshold;
        fan.no_effect_delay_mins = no_effect_delay_mins;
    }

    pub fn set_heater_effectiveness(&mut self, effective_threshold: f32, no_effect_delay_mins: u32) {
        self.cfg.temperature.heater.effective_threshold = effective_threshold;
        self.cfg.temperature.heater.no_effect_delay_mins = no_effect_delay_mins;
    }

    pub fn set_wetting_effectiveness(
        &mut self,
        effective_threshold: f32,
        no_effect_delay_mins: u32,
    ) {
        self.cfg.humidity.wetting.effective_threshold = effective_threshold;
        self.cfg.humidity.wetting.no_effect_delay_mins = no_effect_delay_mins;
    }
}
