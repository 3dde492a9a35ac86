//! Mock hardware adapters for integration tests.
//!
//! Records every relay call and event so tests can assert on the full
//! command history without touching real hardware.

use std::collections::HashMap;

use growbox::app::events::AppEvent;
use growbox::app::ports::{EventSink, ProfilePort, RelayPort, SensorPort, StorageError};
use growbox::control::predictor::EfficiencyProfile;
use growbox::devices::DeviceId;
use growbox::error::SensorError;
use growbox::quantity::Quantity;
use growbox::sensors::{ClimateSample, Location};

// ── Simulated environment + relay recorder ────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RelayCall {
    Set { device: DeviceId, on: bool },
}

/// The box the regulator thinks it is controlling.  Set the fields to
/// steer a scenario; NaN marks a dead sensor.
pub struct MockHardware {
    pub temp_in: f32,
    pub temp_out: f32,
    pub hum_in: f32,
    pub hum_out: f32,
    pub co2_in: f32,
    pub co2_out: f32,

    pub calls: Vec<RelayCall>,
}

#[allow(dead_code)]
impl MockHardware {
    /// Everything comfortably mid-range against the default config.
    pub fn comfortable() -> Self {
        Self {
            temp_in: 23.0,
            temp_out: 15.0,
            hum_in: 85.0,
            hum_out: 50.0,
            co2_in: 800.0,
            co2_out: 420.0,
            calls: Vec::new(),
        }
    }

    /// Last commanded state of one relay (false if never commanded).
    pub fn relay_on(&self, device: DeviceId) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                RelayCall::Set { device: d, on } if *d == device => Some(*on),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn calls_for(&self, device: DeviceId) -> Vec<RelayCall> {
        self.calls
            .iter()
            .filter(|c| matches!(c, RelayCall::Set { device: d, .. } if *d == device))
            .copied()
            .collect()
    }
}

impl SensorPort for MockHardware {
    fn read_climate(&mut self, location: Location) -> Result<ClimateSample, SensorError> {
        let (temperature, humidity) = match location {
            Location::Inner => (self.temp_in, self.hum_in),
            Location::Outer => (self.temp_out, self.hum_out),
        };
        if temperature.is_nan() || humidity.is_nan() {
            return Err(SensorError::ReadFailed);
        }
        Ok(ClimateSample { temperature, humidity })
    }

    fn read_co2(&mut self, location: Location) -> Result<f32, SensorError> {
        let ppm = match location {
            Location::Inner => self.co2_in,
            Location::Outer => self.co2_out,
        };
        if ppm.is_nan() {
            return Err(SensorError::ReadFailed);
        }
        Ok(ppm)
    }
}

impl RelayPort for MockHardware {
    fn set_relay(&mut self, device: DeviceId, on: bool) {
        self.calls.push(RelayCall::Set { device, on });
    }
}

// ── Event recorder ────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
    }
}

// ── Profile store (postcard-encoded, like an NVS blob) ────────

#[derive(Default)]
pub struct MockProfileStore {
    blobs: HashMap<u8, Vec<u8>>,
    pub save_count: u32,
}

#[allow(dead_code)]
impl MockProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a stored profile (simulates a previous run).
    pub fn preload(&mut self, quantity: Quantity, profile: &EfficiencyProfile) {
        let bytes = postcard::to_allocvec(profile).expect("profile encodes");
        self.blobs.insert(quantity as u8, bytes);
    }

    pub fn stored(&self, quantity: Quantity) -> Option<EfficiencyProfile> {
        let bytes = self.blobs.get(&(quantity as u8))?;
        postcard::from_bytes(bytes).ok()
    }
}

impl ProfilePort for MockProfileStore {
    fn load(&self, quantity: Quantity) -> Result<EfficiencyProfile, StorageError> {
        match self.blobs.get(&(quantity as u8)) {
            Some(bytes) => postcard::from_bytes(bytes).map_err(|_| StorageError::IoError),
            None => Err(StorageError::NotFound),
        }
    }

    fn save(
        &mut self,
        quantity: Quantity,
        profile: &EfficiencyProfile,
    ) -> Result<(), StorageError> {
        self.save_count += 1;
        let bytes = postcard::to_allocvec(profile).map_err(|_| StorageError::IoError)?;
        self.blobs.insert(quantity as u8, bytes);
        Ok(())
    }
}
