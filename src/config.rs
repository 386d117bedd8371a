//! Configuration management
//!
//! Configuration is loaded from a TOML file with sensible defaults for
//! every field, so a partial file (or none at all) still yields a working
//! setup. Validation happens eagerly: a config that would produce an
//! unusable poll schedule fails fast instead of silently defaulting.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub poll: PollConfig,
    pub thresholds: Thresholds,
    pub email: EmailConfig,
}

/// Snapshot endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    /// URL of the aggregated health-data endpoint
    pub endpoint: String,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

/// Poll loop configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PollConfig {
    /// Interval between poll cycles in milliseconds
    pub interval_ms: u64,
}

/// Fixed alert thresholds, re-evaluated from scratch on every snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Thresholds {
    /// US AQI above which air quality is alerted
    pub aqi_threshold: f64,
    /// Lower bound of the safe drinking-water pH range
    pub ph_low: f64,
    /// Upper bound of the safe drinking-water pH range
    pub ph_high: f64,
    /// Average ambient noise in dB above which noise is alerted
    pub noise_threshold: f64,
    /// Air temperature in °C at or above which a heatwave is alerted
    pub heatwave_temp_c: f64,
}

/// Email relay configuration for side-effect dispatch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmailConfig {
    /// URL of the email relay endpoint
    pub endpoint: String,
    /// Recipient address for heatwave and flood alerts
    pub recipient: String,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            poll: PollConfig::default(),
            thresholds: Thresholds::default(),
            email: EmailConfig::default(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3000/api/health-data".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval_ms: 5000 }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            aqi_threshold: 150.0,
            ph_low: 6.5,
            ph_high: 8.5,
            noise_threshold: 80.0,
            heatwave_temp_c: 40.0,
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3000/api/sendEmail".to_string(),
            recipient: "alerts@metrowatch.local".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read,
    /// `ConfigError::TomlError` if it is not valid TOML, or
    /// `ConfigError::ValidationError` if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` describing the first invalid
    /// value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll.interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "poll.interval_ms must be positive".to_string(),
            ));
        }
        if self.thresholds.ph_low > self.thresholds.ph_high {
            return Err(ConfigError::ValidationError(format!(
                "thresholds.ph_low ({}) must not exceed thresholds.ph_high ({})",
                self.thresholds.ph_low, self.thresholds.ph_high
            )));
        }
        if self.source.endpoint.is_empty() {
            return Err(ConfigError::ValidationError(
                "source.endpoint must not be empty".to_string(),
            ));
        }
        if self.email.endpoint.is_empty() {
            return Err(ConfigError::ValidationError(
                "email.endpoint must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Poll interval as a std Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll.interval_ms)
    }
}
