//! Sensor subsystem — reading ownership, validity and warm-up handling.
//!
//! The [`SensorHub`] owns every [`Reading`] in the system (indoor and
//! outdoor, per quantity) and refreshes them once per scan through the
//! [`SensorPort`].  Raw driver concerns (bus protocol, register access)
//! live behind the port; the hub handles what the control core cares
//! about:
//!
//! * bounded read retry before declaring a sensor invalid,
//! * validity lifecycle (a dead sensor clears its readings and forces
//!   the dependent alert to Idle),
//! * the CO2 sensor's warm-up window, during which its samples are
//!   discarded,
//! * enabling/disabling trend-stat accumulation across an
//!   indoor/outdoor pair.

use log::{info, warn};

use crate::app::ports::SensorPort;
use crate::config::GreenhouseConfig;
use crate::quantity::Quantity;
use crate::readings::{AccuracyModel, Reading};

/// DHT22 datasheet accuracy.
pub const DHT22_TEMPERATURE_ACCURACY: f32 = 0.5;
pub const DHT22_HUMIDITY_ACCURACY: f32 = 2.0;

/// MH-Z19 accuracy: ±50 ppm ± 5 % of reading.
pub const MHZ19_CO2_ACCURACY: f32 = 50.0;
pub const MHZ19_CO2_ACCURACY_FACTOR: f32 = 0.05;

/// MH-Z19 needs about three minutes after power-up before its readings
/// settle.
pub const MHZ19_WARMUP_MS: u64 = 3 * 60 * 1000;

/// Read attempts per scan before a sensor is declared invalid.
pub const SENSOR_RETRY_COUNT: u32 = 3;

/// Which side of the enclosure a sensor watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Inner,
    Outer,
}

/// One combined temperature/humidity read.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClimateSample {
    pub temperature: f32,
    pub humidity: f32,
}

// ───────────────────────────────────────────────────────────────
// Climate sensor (DHT22-class): temperature + humidity
// ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ClimateSensor {
    location: Location,
    pub temperature: Reading,
    pub humidity: Reading,
    active: bool,
}

impl ClimateSensor {
    fn new(location: Location, cfg: &GreenhouseConfig) -> Self {
        let mut temperature = Reading::new(
            AccuracyModel::Fixed(DHT22_TEMPERATURE_ACCURACY),
            Quantity::Temperature.unit(),
            cfg.temperature.smoothing_window,
        );
        temperature.set_hysteresis(cfg.temperature.hysteresis);

        let mut humidity = Reading::new(
            AccuracyModel::Fixed(DHT22_HUMIDITY_ACCURACY),
            Quantity::Humidity.unit(),
            cfg.humidity.smoothing_window,
        );
        humidity.set_hysteresis(cfg.humidity.hysteresis);

        if location == Location::Outer {
            temperature.set_offset(cfg.temperature.offset);
            humidity.set_offset(cfg.humidity.offset);
        }

        Self { location, temperature, humidity, active: false }
    }

    fn update(&mut self, now_ms: u64, hw: &mut impl SensorPort) {
        let mut result = hw.read_climate(self.location);
        for _ in 1..SENSOR_RETRY_COUNT {
            if result.is_ok() {
                break;
            }
            result = hw.read_climate(self.location);
        }

        match result {
            Ok(sample) => {
                self.set_active(true);
                self.temperature.put_value(sample.temperature, now_ms);
                self.humidity.put_value(sample.humidity, now_ms);
            }
            Err(e) => {
                if self.active {
                    warn!("climate sensor ({:?}) lost: {e}", self.location);
                }
                self.set_active(false);
            }
        }
    }

    fn set_active(&mut self, active: bool) {
        if self.active == active {
            return;
        }

        if !active {
            // Stale data must not feed the policy when reads resume.
            self.temperature.clear();
            self.humidity.clear();
        }
        self.active = active;
    }

    pub fn is_valid(&self) -> bool {
        self.active
    }
}

// ───────────────────────────────────────────────────────────────
// CO2 sensor (MH-Z19-class)
// ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Co2Sensor {
    location: Location,
    pub co2: Reading,
    active: bool,
    started_ms: u64,
    warmup_ms: u64,
}

impl Co2Sensor {
    fn new(location: Location, cfg: &GreenhouseConfig) -> Self {
        let mut co2 = Reading::new(
            AccuracyModel::Proportional {
                base: MHZ19_CO2_ACCURACY,
                factor: MHZ19_CO2_ACCURACY_FACTOR,
            },
            Quantity::Co2.unit(),
            cfg.co2.smoothing_window,
        );
        co2.set_hysteresis(cfg.co2.hysteresis);

        if location == Location::Outer {
            co2.set_offset(cfg.co2.offset);
        }

        Self {
            location,
            co2,
            active: false,
            started_ms: 0,
            warmup_ms: MHZ19_WARMUP_MS,
        }
    }

    fn update(&mut self, now_ms: u64, hw: &mut impl SensorPort) {
        let mut result = hw.read_co2(self.location);
        for _ in 1..SENSOR_RETRY_COUNT {
            if result.is_ok() {
                break;
            }
            result = hw.read_co2(self.location);
        }

        match result {
            Ok(ppm) => {
                if !self.active {
                    self.started_ms = now_ms;
                    self.active = true;
                    if self.warmup_ms > 0 {
                        info!("CO2 sensor ({:?}) warming up", self.location);
                    }
                }

                // Warm-up values drift wildly; don't let them into the
                // smoothing window.
                if !self.is_warming(now_ms) {
                    self.co2.put_value(ppm, now_ms);
                }
            }
            Err(e) => {
                if self.active {
                    warn!("CO2 sensor ({:?}) lost: {e}", self.location);
                    self.co2.clear();
                }
                self.active = false;
                self.started_ms = 0;
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        self.active
    }

    pub fn is_warming(&self, now_ms: u64) -> bool {
        self.active
            && self.warmup_ms > 0
            && now_ms.saturating_sub(self.started_ms) < self.warmup_ms
    }

    /// Warm-up progress for display, 0–100.
    pub fn warmup_percent(&self, now_ms: u64) -> f32 {
        if !self.active {
            return 0.0;
        }
        if self.warmup_ms == 0 {
            return 100.0;
        }
        let elapsed = now_ms.saturating_sub(self.started_ms) as f32;
        (elapsed * 100.0 / self.warmup_ms as f32).min(100.0)
    }

    /// Override the warm-up window (tests, pre-heated hardware).
    pub fn set_warmup_ms(&mut self, warmup_ms: u64) {
        self.warmup_ms = warmup_ms;
    }
}

// ───────────────────────────────────────────────────────────────
// SensorHub
// ───────────────────────────────────────────────────────────────

/// Owns every reading in the system and refreshes them each scan.
#[derive(Debug)]
pub struct SensorHub {
    pub climate_in: ClimateSensor,
    pub climate_out: ClimateSensor,
    pub co2_in: Co2Sensor,
    pub co2_out: Co2Sensor,
}

impl SensorHub {
    pub fn new(cfg: &GreenhouseConfig) -> Self {
        Self {
            climate_in: ClimateSensor::new(Location::Inner, cfg),
            climate_out: ClimateSensor::new(Location::Outer, cfg),
            co2_in: Co2Sensor::new(Location::Inner, cfg),
            co2_out: Co2Sensor::new(Location::Outer, cfg),
        }
    }

    /// Refresh every sensor.  Individual failures are contained — a
    /// single flaky sensor must not stall the control loop.
    pub fn update_all(&mut self, now_ms: u64, hw: &mut impl SensorPort) {
        self.climate_in.update(now_ms, hw);
        self.climate_out.update(now_ms, hw);
        self.co2_in.update(now_ms, hw);
        self.co2_out.update(now_ms, hw);
    }

    /// The reading for `quantity` at `location`.
    pub fn reading(&self, quantity: Quantity, location: Location) -> &Reading {
        match (quantity, location) {
            (Quantity::Temperature, Location::Inner) => &self.climate_in.temperature,
            (Quantity::Temperature, Location::Outer) => &self.climate_out.temperature,
            (Quantity::Humidity, Location::Inner) => &self.climate_in.humidity,
            (Quantity::Humidity, Location::Outer) => &self.climate_out.humidity,
            (Quantity::Co2, Location::Inner) => &self.co2_in.co2,
            (Quantity::Co2, Location::Outer) => &self.co2_out.co2,
        }
    }

    pub fn reading_mut(&mut self, quantity: Quantity, location: Location) -> &mut Reading {
        match (quantity, location) {
            (Quantity::Temperature, Location::Inner) => &mut self.climate_in.temperature,
            (Quantity::Temperature, Location::Outer) => &mut self.climate_out.temperature,
            (Quantity::Humidity, Location::Inner) => &mut self.climate_in.humidity,
            (Quantity::Humidity, Location::Outer) => &mut self.climate_out.humidity,
            (Quantity::Co2, Location::Inner) => &mut self.co2_in.co2,
            (Quantity::Co2, Location::Outer) => &mut self.co2_out.co2,
        }
    }

    /// Whether the *indoor* sensor behind `quantity` currently reads.
    pub fn is_valid(&self, quantity: Quantity) -> bool {
        match quantity {
            Quantity::Temperature | Quantity::Humidity => self.climate_in.is_valid(),
            Quantity::Co2 => self.co2_in.is_valid(),
        }
    }

    /// Toggle trend-stat accumulation for both sides of a quantity.
    pub fn set_stat_enabled(&mut self, quantity: Quantity, enabled: bool) {
        self.reading_mut(quantity, Location::Inner)
            .stat
            .set_enabled(enabled);
        self.reading_mut(quantity, Location::Outer)
            .stat
            .set_enabled(enabled);
    }
}
