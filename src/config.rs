//! Configuration System using Figment
//!
//! Describes the devices a recipe runner drives. Configuration is loaded from:
//! 1. `config/lab.toml` (base configuration)
//! 2. Environment variables (prefixed with `LABCMD_`, `__` separates levels)
//!
//! Timeouts are human-readable durations (`"1s"`, `"500ms"`, `"10m"`).
//!
//! ```toml
//! [application]
//! name = "Heating bench"
//! log_level = "info"
//!
//! [[heating_stages]]
//! name = "hs1"
//! port = "/dev/ttyACM0"
//! baud_rate = 9600
//! timeout = "1s"
//! heating_timeout = "10m"
//!
//! [[sonicators]]
//! name = "sonic"
//! port = "/dev/ttyUSB1"
//! ```
//!
//! # Environment Variable Overrides
//!
//! ```text
//! LABCMD_APPLICATION__LOG_LEVEL=debug
//! LABCMD_APPLICATION__NAME="Night run"
//! ```

use crate::instrument::heating_stage::DEFAULT_HEATING_TIMEOUT;
use crate::instrument::sonicator::DEFAULT_OPERATION_TIMEOUT;
use crate::instrument::DEFAULT_TIMEOUT;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/lab.toml";

/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "LABCMD_";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration load error: {0}")]
    LoadError(#[from] figment::Error),
    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Heating stage definitions
    #[serde(default)]
    pub heating_stages: Vec<HeatingStageConfig>,
    /// Sonicator definitions
    #[serde(default)]
    pub sonicators: Vec<SonicatorConfig>,
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_app_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
        }
    }
}

/// Heating stage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatingStageConfig {
    /// Unique device name
    pub name: String,
    /// Serial port (e.g., "/dev/ttyACM0")
    pub port: String,
    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Acknowledgment / quick-operation timeout
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    /// Completion timeout when ramping to a target temperature
    #[serde(default = "default_heating_timeout", with = "humantime_serde")]
    pub heating_timeout: Duration,
}

/// Sonicator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SonicatorConfig {
    /// Unique device name
    pub name: String,
    /// Serial port (e.g., "/dev/ttyUSB1")
    pub port: String,
    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Generic timeout
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    /// Upper bound for one sonication step
    #[serde(default = "default_operation_timeout", with = "humantime_serde")]
    pub operation_timeout: Duration,
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "lab_commands".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_heating_timeout() -> Duration {
    DEFAULT_HEATING_TIMEOUT
}

fn default_operation_timeout() -> Duration {
    DEFAULT_OPERATION_TIMEOUT
}

// ============================================================================
// Configuration Loading and Validation
// ============================================================================

impl LabConfig {
    /// Load configuration from `config/lab.toml` and environment variables
    ///
    /// Environment variables take precedence over the file. After loading,
    /// configuration is validated.
    ///
    /// # Errors
    ///
    /// Returns a ConfigError if the file cannot be parsed or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    ///
    /// A missing file is not an error: defaults and environment overrides
    /// still apply.
    ///
    /// # Errors
    ///
    /// Returns a ConfigError if the file is invalid or validation fails.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: Self = Figment::from(Serialized::defaults(LabConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    ///
    /// Checks:
    /// - Log level is valid (trace, debug, info, warn, error)
    /// - Device names are non-empty and unique across all device kinds
    /// - Ports are non-empty, baud rates and timeouts are non-zero
    ///
    /// # Errors
    ///
    /// Returns a ConfigError with a descriptive message for any validation failure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        let mut names = HashSet::new();
        let devices = self
            .heating_stages
            .iter()
            .map(|d| (d.name.as_str(), d.port.as_str(), d.baud_rate, [d.timeout, d.heating_timeout]))
            .chain(
                self.sonicators
                    .iter()
                    .map(|d| (d.name.as_str(), d.port.as_str(), d.baud_rate, [d.timeout, d.operation_timeout])),
            );

        for (name, port, baud_rate, timeouts) in devices {
            if name.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "Device name must not be empty".to_string(),
                ));
            }
            if !names.insert(name) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate device name: '{}'",
                    name
                )));
            }
            if port.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "Device '{}' has an empty port",
                    name
                )));
            }
            if baud_rate == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "Device '{}' has a zero baud rate",
                    name
                )));
            }
            if timeouts.iter().any(Duration::is_zero) {
                return Err(ConfigError::ValidationError(format!(
                    "Device '{}' has a zero timeout",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Look up a heating stage definition by name.
    pub fn heating_stage(&self, name: &str) -> Option<&HeatingStageConfig> {
        self.heating_stages.iter().find(|d| d.name == name)
    }

    /// Look up a sonicator definition by name.
    pub fn sonicator(&self, name: &str) -> Option<&SonicatorConfig> {
        self.sonicators.iter().find(|d| d.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    #[serial]
    fn test_load_with_defaults() {
        let file = write_config(
            r#"
            [[heating_stages]]
            name = "hs1"
            port = "/dev/ttyACM0"
            "#,
        );

        let config = LabConfig::load_from(file.path()).unwrap();
        let stage = config.heating_stage("hs1").unwrap();
        assert_eq!(stage.baud_rate, 9600);
        assert_eq!(stage.timeout, Duration::from_secs(1));
        assert_eq!(stage.heating_timeout, Duration::from_secs(600));
        assert_eq!(config.application.log_level, "info");
        assert!(config.sonicators.is_empty());
    }

    #[test]
    #[serial]
    fn test_humantime_durations() {
        let file = write_config(
            r#"
            [[heating_stages]]
            name = "hs1"
            port = "COM3"
            baud_rate = 115200
            timeout = "500ms"
            heating_timeout = "15m"

            [[sonicators]]
            name = "sonic"
            port = "COM4"
            operation_timeout = "45s"
            "#,
        );

        let config = LabConfig::load_from(file.path()).unwrap();
        let stage = config.heating_stage("hs1").unwrap();
        assert_eq!(stage.timeout, Duration::from_millis(500));
        assert_eq!(stage.heating_timeout, Duration::from_secs(900));
        let sonicator = config.sonicator("sonic").unwrap();
        assert_eq!(sonicator.operation_timeout, Duration::from_secs(45));
    }

    #[test]
    #[serial]
    fn test_duplicate_names_rejected() {
        let file = write_config(
            r#"
            [[heating_stages]]
            name = "dev"
            port = "COM3"

            [[sonicators]]
            name = "dev"
            port = "COM4"
            "#,
        );

        let err = LabConfig::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("Duplicate device name: 'dev'"));
    }

    #[test]
    #[serial]
    fn test_zero_timeout_rejected() {
        let file = write_config(
            r#"
            [[heating_stages]]
            name = "hs1"
            port = "COM3"
            heating_timeout = "0s"
            "#,
        );

        let err = LabConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    #[serial]
    fn test_env_override_log_level() {
        let file = write_config("");
        std::env::set_var("LABCMD_APPLICATION__LOG_LEVEL", "debug");
        let result = LabConfig::load_from(file.path());
        std::env::remove_var("LABCMD_APPLICATION__LOG_LEVEL");

        assert_eq!(result.unwrap().application.log_level, "debug");
    }

    #[test]
    #[serial]
    fn test_invalid_log_level_rejected() {
        let config = LabConfig {
            application: ApplicationConfig {
                name: "bench".into(),
                log_level: "verbose".into(),
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
