//! Integration test harness.
//!
//! Exercises the full regulator service against mock hardware — no
//! GPIO, no buses, simulated time.

mod alert_flow_tests;
mod mock_hw;
mod regulator_tests;
