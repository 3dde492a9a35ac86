//! Port traits — the hexagonal boundary between domain logic and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Regulator (domain)
//! ```
//!
//! Driven adapters (sensor buses, relay drivers, event sinks, storage)
//! implement these traits.  The [`Regulator`](super::service::Regulator)
//! consumes them via generics, so the domain core never touches hardware
//! directly and every scenario is testable with mock adapters.

use crate::config::GreenhouseConfig;
use crate::control::predictor::EfficiencyProfile;
use crate::devices::DeviceId;
use crate::error::SensorError;
use crate::quantity::Quantity;
use crate::sensors::{ClimateSample, Location};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the domain calls this to obtain raw samples.
///
/// A failed read is a typed error, never a crash; the hub retries a
/// bounded number of times per scan.  Implementations may block briefly
/// between retries (the only tolerated busy-wait in the system — rare
/// and short by construction).
pub trait SensorPort {
    /// Read the combined temperature/humidity sensor at `location`.
    fn read_climate(&mut self, location: Location) -> Result<ClimateSample, SensorError>;

    /// Read the CO2 sensor (ppm) at `location`.
    fn read_co2(&mut self, location: Location) -> Result<f32, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Relay port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain pushes actuator relay states through
/// this.  Called only on edges — the domain diffs against the last
/// applied state.
pub trait RelayPort {
    fn set_relay(&mut self, device: DeviceId, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, MQTT,
/// web socket, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Profile port (domain ↔ learned-efficiency persistence)
// ───────────────────────────────────────────────────────────────

/// Loads and persists learned actuator-efficiency tables.
///
/// The on-disk format is the adapter's business; the domain hands over
/// an [`EfficiencyProfile`] snapshot (one mean per bucket and
/// direction).  A missing profile on first boot is expected — return
/// [`StorageError::NotFound`] and the predictor starts empty.
pub trait ProfilePort {
    fn load(&self, quantity: Quantity) -> Result<EfficiencyProfile, StorageError>;

    fn save(&mut self, quantity: Quantity, profile: &EfficiencyProfile)
    -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate before persisting
/// ([`GreenhouseConfig::validate`]) and reject invalid values with
/// [`ConfigError::ValidationFailed`] rather than silently clamping.
pub trait ConfigPort {
    /// Returns [`GreenhouseConfig::default`] if no stored config exists.
    fn load(&self) -> Result<GreenhouseConfig, ConfigError>;

    fn save(&self, config: &GreenhouseConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`ProfilePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested entry does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "entry not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
