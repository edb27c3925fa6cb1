//! Custom error types for the harness.
//!
//! This module defines `HarnessError`, the error type shared by the test
//! orchestration core and the command-line runner. It follows a simple rule:
//! per-check failures (a button that was never pressed, an LED the operator did
//! not confirm) are *outcomes*, recorded in a test's ledger, and never surface
//! here. Only failures that make a whole test meaningless travel as errors:
//!
//! - **`Config`** / **`Configuration`**: loading or validating `HarnessConfig`.
//! - **`Io`**: log file creation and console I/O.
//! - **`Precondition`**: the device rejected a call a test cannot proceed
//!   without (entering or leaving a test mode, switching the LED off before and
//!   after the palette). These abort the suite.
//! - **`Subscription`**: the device event stream could not be opened.
//! - **`Device`**: a data-returning call (such as device info) came back non-OK.

use crate::device::{Status, TestKind};
use thiserror::Error;

/// Convenience alias for results using the harness error type.
pub type AppResult<T> = std::result::Result<T, HarnessError>;

/// Errors that abort a test or the whole run.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Figment failed to assemble the configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    /// The configuration parsed but holds invalid values.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// Filesystem or console I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A call the test depends on returned a non-OK status.
    #[error("{test}: precondition '{command}' failed with status {status}")]
    Precondition {
        /// Name of the test that issued the call.
        test: String,
        /// The call that failed, e.g. `StartTest(BUTTONS)`.
        command: String,
        /// Status returned by the device.
        status: Status,
    },

    /// The device event stream could not be opened.
    #[error("Event subscription error: {0}")]
    Subscription(String),

    /// A data-returning device call failed.
    #[error("Device call failed with status {0}")]
    Device(Status),
}

impl HarnessError {
    /// Precondition failure for entering or leaving a device test mode.
    pub fn test_mode(test: &str, verb: &str, kind: TestKind, status: Status) -> Self {
        HarnessError::Precondition {
            test: test.to_string(),
            command: format!("{verb}({kind})"),
            status,
        }
    }

    /// True for errors raised by the device rejecting a required call.
    pub fn is_precondition(&self) -> bool {
        matches!(self, HarnessError::Precondition { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_display() {
        let err = HarnessError::test_mode(
            "ButtonsTest",
            "StartTest",
            TestKind::Buttons,
            Status::Unavailable,
        );
        assert_eq!(
            err.to_string(),
            "ButtonsTest: precondition 'StartTest(BUTTONS)' failed with status UNAVAILABLE"
        );
        assert!(err.is_precondition());
    }

    #[test]
    fn test_configuration_error_display() {
        let err = HarnessError::Configuration("timeout_ms must be greater than zero".into());
        assert!(err.to_string().contains("timeout_ms"));
        assert!(!err.is_precondition());
    }
}
