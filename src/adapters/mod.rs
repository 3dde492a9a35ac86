//! Platform adapters.
//!
//! Everything here sits on the outside of the port boundary.  The only
//! adapter this crate ships is the monotonic clock; sensor buses, relay
//! drivers and storage belong to the embedding firmware.

pub mod time;
