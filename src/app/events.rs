//! Outbound application events.
//!
//! The [`Regulator`](super::service::Regulator) emits these through the
//! [`EventSink`](super::ports::EventSink) port, replacing the callback
//! hooks a UI layer would otherwise have to register on every
//! component.  Events fire on edges only, synchronously within the tick
//! that produced them.

use crate::alerts::AlertState;
use crate::devices::DeviceId;
use crate::quantity::Quantity;

/// Structured events emitted by the regulator core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppEvent {
    /// An alert accepted a state transition.
    AlertChanged {
        quantity: Quantity,
        from: AlertState,
        to: AlertState,
    },

    /// A device's cycle started or finished (the relay may still pulse
    /// within an active cycle).
    DeviceActive { device: DeviceId, active: bool },

    /// A device's relay output flipped.
    DeviceSwitched { device: DeviceId, on: bool },

    /// A sensor's validity changed (read failures exhausted retries, or
    /// reads resumed).
    SensorValidity { quantity: Quantity, valid: bool },
}
