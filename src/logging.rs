//! Tracing setup for a harness run.
//!
//! Every run writes its own log file, `factory-logs-<YYYYmmddHHMMSS>.txt`, so
//! the device traffic of one unit can be attached to its test record. Console
//! output for the operator does not go through tracing; see [`crate::operator`].
//!
//! `RUST_LOG` takes precedence over `application.log_level`:
//!
//! ```bash
//! RUST_LOG=factory_harness=trace factory-harness --simulate
//! ```

use crate::config::HarnessConfig;
use crate::error::{AppResult, HarnessError};
use chrono::{DateTime, Local};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// File name of the log for a run started at `started`.
pub fn log_file_name(started: DateTime<Local>) -> String {
    format!("factory-logs-{}.txt", started.format("%Y%m%d%H%M%S"))
}

/// Create the log file for a run started at `started` inside `dir`.
pub fn create_log_file(dir: &Path, started: DateTime<Local>) -> AppResult<(PathBuf, File)> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(log_file_name(started));
    let file = File::create(&path)?;
    Ok((path, file))
}

/// Install the global subscriber writing to a fresh log file.
///
/// Returns the path of the log file.
pub fn init_from_config(config: &HarnessConfig) -> AppResult<PathBuf> {
    let (path, file) = create_log_file(&config.application.log_dir, Local::now())?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.application.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|err| {
            HarnessError::Configuration(format!("Failed to install log subscriber: {err}"))
        })?;

    Ok(path)
}
