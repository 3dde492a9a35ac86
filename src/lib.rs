//! GrowBox climate regulator core.
//!
//! The control brain of an enclosed growing space: decides from noisy
//! sensor readings when temperature, humidity or CO2 is out of range,
//! drives the fans/heater/humidifier to correct it, learns how
//! effective each actuation is, and sizes future runs from what it
//! learned.
//!
//! Single-threaded and tick-driven: the embedding main loop calls
//! [`app::service::Regulator::tick`] at a fixed cadence with a
//! monotonic millisecond clock.  All hardware and persistence access
//! goes through the port traits in [`app::ports`], so the whole crate
//! compiles and tests on the host; ESP-IDF-specific code is guarded by
//! `target_os = "espidf"` within the adapters.

#![deny(unused_must_use)]

pub mod alerts;
pub mod app;
pub mod compare;
pub mod config;
pub mod control;
pub mod devices;
pub mod error;
pub mod quantity;
pub mod readings;
pub mod sensors;

pub mod adapters;
