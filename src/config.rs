//! Harness configuration using Figment
//!
//! Configuration is assembled from, in increasing order of precedence:
//! 1. Built-in defaults
//! 2. A TOML file (default: `config/factory.toml`; a missing file is skipped)
//! 3. Environment variables prefixed with `FACTORY_`
//!
//! # Environment Variable Overrides
//!
//! Nested keys are separated by a double underscore so that field names keep
//! their own underscores:
//!
//! ```text
//! FACTORY_APPLICATION__LOG_LEVEL=trace
//! FACTORY_BUTTONS__TIMEOUT_MS=20000
//! FACTORY_LED__BRIGHTNESS=64
//! ```
//!
//! # Example
//!
//! ```no_run
//! use factory_harness::config::HarnessConfig;
//!
//! let config = HarnessConfig::load()?;
//! println!("Button timeout: {:?}", config.buttons.timeout());
//! # Ok::<(), factory_harness::error::HarnessError>(())
//! ```

use crate::error::{AppResult, HarnessError};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/factory.toml";

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "FACTORY_";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Process-wide settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Button check settings
    #[serde(default)]
    pub buttons: ButtonConfig,
    /// LED settings shared by all checks
    #[serde(default)]
    pub led: LedConfig,
}

/// Process-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory the run's log file is written to
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

/// Button check settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonConfig {
    /// Timeout of each press and each release wait, in milliseconds
    #[serde(default = "default_button_timeout")]
    pub timeout_ms: u64,
}

/// LED settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedConfig {
    /// Brightness used when lighting the LED (1-255)
    #[serde(default = "default_brightness")]
    pub brightness: u8,
    /// Pause between the steps of a pass/fail blink, in milliseconds
    #[serde(default = "default_blink_ms")]
    pub blink_ms: u64,
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_log_level() -> String {
    "debug".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_button_timeout() -> u64 {
    10_000
}

fn default_brightness() -> u8 {
    255
}

fn default_blink_ms() -> u64 {
    50
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: default_log_dir(),
        }
    }
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_button_timeout(),
        }
    }
}

impl Default for LedConfig {
    fn default() -> Self {
        Self {
            brightness: default_brightness(),
            blink_ms: default_blink_ms(),
        }
    }
}

impl ButtonConfig {
    /// Per-wait timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ============================================================================
// Configuration Loading and Validation
// ============================================================================

impl HarnessConfig {
    /// Load from [`DEFAULT_CONFIG_PATH`] and the environment.
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from a specific file and the environment, then validate.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        Self::from_figment(Self::figment(path.as_ref()))
    }

    /// Provider stack used by [`HarnessConfig::load_from`].
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(HarnessConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Extract and validate a configuration from `figment`.
    pub fn from_figment(figment: Figment) -> AppResult<Self> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    ///
    /// Checks:
    /// - Log level is valid (trace, debug, info, warn, error)
    /// - Button timeout is non-zero
    /// - LED brightness is non-zero
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(HarnessError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.buttons.timeout_ms == 0 {
            return Err(HarnessError::Configuration(
                "buttons.timeout_ms must be greater than zero".to_string(),
            ));
        }

        if self.led.brightness == 0 {
            return Err(HarnessError::Configuration(
                "led.brightness must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
