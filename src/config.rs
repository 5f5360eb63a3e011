//! Configuration management for catchup
//!
//! Settings come from an optional TOML file, then command-line flags on top.
//! Everything has a default, so running with no file and no flags watches a
//! validator on localhost.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Which endpoint to watch and how often
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TargetConfig {
    /// Metrics URL exposing the checkpoint gauges
    #[serde(default = "default_addr")]
    pub addr: String,
    /// Seconds between polls
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    /// Stop after this many failed polls in a row (unset = retry forever)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_failures: Option<u32>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            interval_seconds: default_interval_seconds(),
            max_failures: None,
        }
    }
}

impl TargetConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

fn default_addr() -> String {
    "http://localhost:9187/metrics".to_string()
}

fn default_interval_seconds() -> u64 {
    1
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// Anything chattier than warn would fight the status line for the terminal
fn default_log_level() -> String {
    "warn".to_string()
}

/// Values given on the command line; `None` leaves the file/default value
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub addr: Option<String>,
    pub interval_seconds: Option<u64>,
    pub max_failures: Option<u32>,
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
            path: path_display.clone(),
            source,
        })?;

        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display.clone(),
                reason: e.to_string(),
            })?;

        tracing::debug!(path = %path_display, "Loaded configuration file");
        Ok(config)
    }

    /// Resolve the effective configuration
    ///
    /// Starts from `path` if given (defaults otherwise), applies command-line
    /// overrides and validates the result.
    pub fn load(path: Option<&Path>, overrides: Overrides) -> AppResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Layer command-line values over this configuration
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(addr) = overrides.addr {
            self.target.addr = addr;
        }
        if let Some(interval) = overrides.interval_seconds {
            self.target.interval_seconds = interval;
        }
        if overrides.max_failures.is_some() {
            self.target.max_failures = overrides.max_failures;
        }
        if let Some(level) = overrides.log_level {
            self.observability.log_level = level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.target.addr.trim().is_empty() {
            return Err(AppError::Config(
                "target address is empty. Please specify --addr \
                (e.g. --addr http://localhost:9187/metrics)"
                    .to_string(),
            ));
        }

        if self.target.interval_seconds == 0 {
            return Err(AppError::Config(
                "interval must be at least 1 second".to_string(),
            ));
        }

        if self.target.max_failures == Some(0) {
            return Err(AppError::Config(
                "max_failures must be greater than 0 (omit it to retry forever)".to_string(),
            ));
        }

        if self.observability.log_level.trim().is_empty() {
            return Err(AppError::Config("log_level is empty".to_string()));
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_CONFIG: &str = r#"
[target]
addr = "http://10.0.0.5:9184/metrics"
interval_seconds = 5
max_failures = 30

[observability]
log_level = "debug"
"#;

    #[test]
    fn test_config_from_str_parses_successfully() {
        let config = Config::from_str(TEST_CONFIG).expect("should parse config");
        assert_eq!(config.target.addr, "http://10.0.0.5:9184/metrics");
        assert_eq!(config.target.interval_seconds, 5);
        assert_eq!(config.target.max_failures, Some(30));
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_str("").expect("empty config is valid");
        assert_eq!(config, Config::default());
        assert_eq!(config.target.addr, "http://localhost:9187/metrics");
        assert_eq!(config.target.interval(), Duration::from_secs(1));
        assert_eq!(config.target.max_failures, None);
        assert_eq!(config.observability.log_level, "warn");
    }

    #[test]
    fn test_empty_addr_is_rejected() {
        let err = Config::from_str("[target]\naddr = \"\"\n").expect_err("empty addr");
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("--addr"));
    }

    #[test]
    fn test_blank_addr_is_rejected() {
        assert!(Config::from_str("[target]\naddr = \"   \"\n").is_err());
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        assert!(Config::from_str("[target]\ninterval_seconds = 0\n").is_err());
    }

    #[test]
    fn test_long_interval_is_accepted() {
        let config = Config::from_str("[target]\ninterval_seconds = 7200\n")
            .expect("any positive interval is valid");
        assert_eq!(config.target.interval_seconds, 7200);
        assert_eq!(config.target.interval(), Duration::from_secs(7200));
    }

    #[test]
    fn test_zero_max_failures_is_rejected() {
        assert!(Config::from_str("[target]\nmax_failures = 0\n").is_err());
    }

    #[test]
    fn test_negative_interval_fails_to_parse() {
        let err = Config::from_str("[target]\ninterval_seconds = -1\n").expect_err("negative");
        assert!(matches!(err, AppError::ConfigParseFailed { .. }));
    }

    #[test]
    fn test_overrides_win_over_file_values() {
        let mut config = Config::from_str(TEST_CONFIG).unwrap();
        config.apply(Overrides {
            addr: Some("http://127.0.0.1:1/metrics".to_string()),
            interval_seconds: Some(2),
            max_failures: None,
            log_level: None,
        });

        assert_eq!(config.target.addr, "http://127.0.0.1:1/metrics");
        assert_eq!(config.target.interval_seconds, 2);
        // Not overridden
        assert_eq!(config.target.max_failures, Some(30));
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn test_load_without_file_validates_overrides() {
        let err = Config::load(
            None,
            Overrides {
                addr: Some(String::new()),
                ..Overrides::default()
            },
        )
        .expect_err("empty addr from the command line");
        assert!(matches!(err, AppError::Config(_)));
    }
}
