//! System configuration parameters.
//!
//! All tunable parameters for the regulator core.  Values are persisted
//! through a [`ConfigPort`](crate::app::ports::ConfigPort) implementation
//! (NVS, file, web UI — not this crate's concern) and can change at
//! runtime through the [`Regulator`](crate::app::service::Regulator)
//! setters.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Timing and effectiveness parameters for one actuation channel
/// (a device working on behalf of one quantity/direction).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ActuationTiming {
    /// On-phase length per pulse (ms).
    pub duration_ms: u64,
    /// Off-phase after the pulse before the cycle resolves (ms).
    pub delay_ms: u64,
    /// Minimum observed movement for the actuation to count as working.
    pub effective_threshold: f32,
    /// Cooldown after declaring the actuation ineffective (minutes,
    /// 0 disables the retry).
    pub no_effect_delay_mins: u32,
}

/// Temperature control section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TemperatureControl {
    pub enabled: bool,
    /// Alarm threshold (°C) below which heating engages.
    pub alarm_low: f32,
    /// Alarm threshold (°C) above which venting engages.
    pub alarm_high: f32,
    /// Minimum delta (°C) for the trend tracker to record a change.
    pub hysteresis: f32,
    /// Calibration offset applied to the outdoor reading (°C).
    pub offset: f32,
    /// Smoothing window size in samples (< 2 disables smoothing).
    pub smoothing_window: usize,
    pub fan: ActuationTiming,
    pub heater: ActuationTiming,
}

/// Humidity control section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HumidityControl {
    pub enabled: bool,
    /// Alarm threshold (% RH) below which wetting engages.
    pub alarm_low: f32,
    /// Alarm threshold (% RH) above which venting engages.
    pub alarm_high: f32,
    pub hysteresis: f32,
    pub offset: f32,
    pub smoothing_window: usize,
    pub fan: ActuationTiming,
    /// Humidifier channel.  `duration_ms` is the fallback pulse length
    /// when the predictor has nothing to say.
    pub wetting: ActuationTiming,
    /// Clamp window for predicted wetting runs (ms).
    pub predict_min_ms: u64,
    pub predict_max_ms: u64,
}

/// CO2 control section.  CO2 has no low side — nothing adds CO2; the
/// only actuation is venting excess.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Co2Control {
    pub enabled: bool,
    /// Alarm threshold (ppm) above which venting engages.
    pub alarm_high: f32,
    pub hysteresis: f32,
    pub offset: f32,
    pub smoothing_window: usize,
    pub fan: ActuationTiming,
}

/// Core regulator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreenhouseConfig {
    /// Sensor scan (and control re-evaluation) interval (ms).
    pub sensor_scan_interval_ms: u64,
    /// How often dirty predictor profiles are flushed to storage (ms).
    pub profile_save_interval_ms: u64,

    pub temperature: TemperatureControl,
    pub humidity: HumidityControl,
    pub co2: Co2Control,
}

impl Default for GreenhouseConfig {
    fn default() -> Self {
        Self {
            sensor_scan_interval_ms: 2000,
            profile_save_interval_ms: 30_000,

            temperature: TemperatureControl {
                enabled: true,
                alarm_low: 18.0,
                alarm_high: 28.0,
                hysteresis: 0.2,
                offset: 0.0,
                smoothing_window: 5,
                fan: ActuationTiming {
                    duration_ms: 60_000, // 1 min venting pulse
                    delay_ms: 120_000,   // 2 min to settle
                    effective_threshold: 0.5,
                    no_effect_delay_mins: 10,
                },
                heater: ActuationTiming {
                    duration_ms: 600_000, // heating is slow: 10 min
                    delay_ms: 300_000,    // 5 min to spread
                    effective_threshold: 0.5,
                    no_effect_delay_mins: 15,
                },
            },

            humidity: HumidityControl {
                enabled: true,
                alarm_low: 80.0,
                alarm_high: 95.0,
                hysteresis: 0.5,
                offset: 0.0,
                smoothing_window: 5,
                fan: ActuationTiming {
                    duration_ms: 60_000,
                    delay_ms: 120_000,
                    effective_threshold: 1.0,
                    no_effect_delay_mins: 10,
                },
                wetting: ActuationTiming {
                    duration_ms: 15_000, // fallback when unlearned
                    delay_ms: 60_000,
                    effective_threshold: 1.0,
                    no_effect_delay_mins: 10,
                },
                predict_min_ms: 10_000,
                predict_max_ms: 20_000,
            },

            co2: Co2Control {
                enabled: true,
                alarm_high: 1200.0,
                hysteresis: 25.0,
                offset: 0.0,
                smoothing_window: 3,
                fan: ActuationTiming {
                    duration_ms: 60_000,
                    delay_ms: 120_000,
                    effective_threshold: 50.0,
                    no_effect_delay_mins: 10,
                },
            },
        }
    }
}

impl GreenhouseConfig {
    /// Range-check the configuration.  [`ConfigPort`] implementations
    /// must call this before persisting — invalid values are rejected,
    /// not silently clamped.
    ///
    /// [`ConfigPort`]: crate::app::ports::ConfigPort
    pub fn validate(&self) -> Result<()> {
        if self.sensor_scan_interval_ms < 100 {
            return Err(Error::Config("sensor scan interval below 100 ms"));
        }
        if self.temperature.alarm_low >= self.temperature.alarm_high {
            return Err(Error::Config("temperature low threshold must be below high"));
        }
        if self.humidity.alarm_low >= self.humidity.alarm_high {
            return Err(Error::Config("humidity low threshold must be below high"));
        }
        if !(0.0..=100.0).contains(&self.humidity.alarm_low)
            || !(0.0..=100.0).contains(&self.humidity.alarm_high)
        {
            return Err(Error::Config("humidity thresholds must be within 0-100 %"));
        }
        if self.co2.alarm_high <= 0.0 {
            return Err(Error::Config("CO2 threshold must be positive"));
        }
        if self.humidity.predict_min_ms > self.humidity.predict_max_ms {
            return Err(Error::Config("wetting predict window is inverted"));
        }
        if self.temperature.hysteresis < 0.0
            || self.humidity.hysteresis < 0.0
            || self.co2.hysteresis < 0.0
        {
            return Err(Error::Config("hysteresis must not be negative"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = GreenhouseConfig::default();
        assert!(c.validate().is_ok());
        assert!(c.temperature.alarm_low < c.temperature.alarm_high);
        assert!(c.humidity.alarm_low < c.humidity.alarm_high);
        assert!(c.co2.alarm_high > 0.0);
        assert!(c.humidity.predict_min_ms <= c.humidity.predict_max_ms);
        assert!(c.sensor_scan_interval_ms > 0);
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let mut c = GreenhouseConfig::default();
        c.temperature.alarm_low = 30.0;
        c.temperature.alarm_high = 20.0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn humidity_out_of_percent_range_rejected() {
        let mut c = GreenhouseConfig::default();
        c.humidity.alarm_high = 130.0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn negative_hysteresis_rejected() {
        let mut c = GreenhouseConfig::default();
        c.co2.hysteresis = -1.0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn serde_roundtrip() {
        let c = GreenhouseConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: GreenhouseConfig = serde_json::from_str(&json).unwrap();
        assert!((c.temperature.alarm_low - c2.temperature.alarm_low).abs() < 0.001);
        assert_eq!(c.humidity.predict_max_ms, c2.humidity.predict_max_ms);
        assert_eq!(c.co2.fan.duration_ms, c2.co2.fan.duration_ms);
    }

    #[test]
    fn postcard_roundtrip() {
        let c = GreenhouseConfig::default();
        let bytes = postcard::to_allocvec(&c).unwrap();
        let c2: GreenhouseConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(c.sensor_scan_interval_ms, c2.sensor_scan_interval_ms);
        assert!((c.co2.alarm_high - c2.co2.alarm_high).abs() < 0.001);
    }
}
