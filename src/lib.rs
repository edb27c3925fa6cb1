//! Core library for the factory test harness.
//!
//! This library drives a connected board through a scripted sequence of
//! hardware checks (LED colors confirmed by an operator, front-panel button
//! presses reported by the device) and aggregates their pass/fail outcomes
//! into a suite verdict. It is used by the `factory-harness` binary and by the
//! integration tests, which run the suite against [`device::mock::MockDevice`].

pub mod color;
pub mod config;
pub mod device;
pub mod error;
pub mod logging;
pub mod operator;
pub mod testing;
