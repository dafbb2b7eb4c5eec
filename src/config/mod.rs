//! Configuration management for ringroute
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::schedule::Boundary;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Store configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Resolution policy
    #[serde(default)]
    pub resolution: ResolutionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Volatile in-process store
    Memory,
    /// SQLite database file
    Sqlite,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!("unknown store backend '{other}'")),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Which store to open
    pub backend: StoreBackend,

    /// SQLite database path
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            path: PathBuf::from("data/ringroute.db"),
        }
    }
}

/// Resolution configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// Whether window boundary instants count as inside the window
    pub boundary: Boundary,

    /// How far back (hours) range scans look for window starts
    pub lookback_hours: u32,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            boundary: Boundary::Open,
            lookback_hours: 48,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

/// Longest accepted `lookback_hours`
pub const MAX_LOOKBACK_HOURS: u32 = crate::schedule::MAX_LOOKBACK_HOURS as u32;

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let backend = match std::env::var("RINGROUTE_DB_BACKEND") {
            Ok(v) => v.parse::<StoreBackend>().map_err(anyhow::Error::msg)?,
            Err(_) => defaults.database.backend,
        };

        let path = std::env::var("RINGROUTE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.database.path);

        let boundary = match std::env::var("RINGROUTE_BOUNDARY") {
            Ok(v) => v.parse::<Boundary>().map_err(anyhow::Error::msg)?,
            Err(_) => defaults.resolution.boundary,
        };

        let lookback_hours = std::env::var("RINGROUTE_LOOKBACK_HOURS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(defaults.resolution.lookback_hours);

        let level =
            std::env::var("RINGROUTE_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));

        let format =
            std::env::var("RINGROUTE_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        let config = Self {
            database: DatabaseConfig { backend, path },
            resolution: ResolutionConfig {
                boundary,
                lookback_hours,
            },
            logging: LoggingConfig { level, format },
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let lookback = self.resolution.lookback_hours;
        if lookback == 0 || lookback > MAX_LOOKBACK_HOURS {
            anyhow::bail!("lookback_hours must be between 1 and {MAX_LOOKBACK_HOURS}, got {lookback}");
        }

        if self.database.backend == StoreBackend::Sqlite
            && self.database.path.as_os_str().is_empty()
        {
            anyhow::bail!("database path must be set for the sqlite backend");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("log format must be 'text' or 'json', got '{}'", self.logging.format);
        }

        Ok(())
    }

    /// Resolution options derived from this configuration
    pub fn resolve_options(&self) -> crate::error::Result<crate::schedule::ResolveOptions> {
        crate::schedule::ResolveOptions::new(
            self.resolution.boundary,
            chrono::Duration::hours(i64::from(self.resolution.lookback_hours)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.resolution.boundary, Boundary::Open);
        assert_eq!(config.resolution.lookback_hours, 48);
    }

    #[test]
    fn test_invalid_lookback() {
        let mut config = Config::default();
        config.resolution.lookback_hours = 0;
        assert!(config.validate().is_err());

        config.resolution.lookback_hours = MAX_LOOKBACK_HOURS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_toml() {
        let config: Config = toml::from_str(
            r#"
            [database]
            backend = "memory"
            path = ""

            [resolution]
            boundary = "half-open"
            lookback_hours = 72
            "#,
        )
        .unwrap();

        assert_eq!(config.database.backend, StoreBackend::Memory);
        assert_eq!(config.resolution.boundary, Boundary::HalfOpen);
        assert_eq!(config.resolution.lookback_hours, 72);
        assert_eq!(config.logging, LoggingConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolve_options_conversion() {
        let options = Config::default().resolve_options().unwrap();
        assert_eq!(options.lookback(), chrono::Duration::hours(48));
        assert_eq!(options.boundary(), Boundary::Open);

        let mut config = Config::default();
        config.resolution.lookback_hours = 168;
        assert!(config.resolve_options().is_err());
    }
}
