//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the trip-config.toml file.
//! It provides a centralized way to configure the trip service endpoint, the retry
//! policy, log grid resolution and the route interpolation speed.

use crate::grid::{GridSpec, RoundingPolicy};
use crate::trip_client::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Default configuration file, relative to the working directory
pub const CONFIG_FILE: &str = "trip-config.toml";

/// Environment variable overriding `api.base_url`
pub const API_URL_ENV: &str = "TRIP_API_URL";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config serialization: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("config IO: {0}")]
    Io(#[from] std::io::Error),
}

/// Application configuration loaded from trip-config.toml
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Trip-computation service
    pub api: ApiConfig,
    /// Backoff between connectivity retries
    pub retry: RetryPolicy,
    /// Daily log grid resolution
    pub grid: GridConfig,
    /// Rest-break placement along the route
    pub route: RouteConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Base URL of the backend, e.g. "http://localhost:8000"
    pub base_url: String,
    /// Per-attempt request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GridConfig {
    /// Width of one grid cell in minutes
    pub resolution_minutes: u32,
    /// Cells per calendar day
    pub slots_per_day: usize,
    /// How a partial trailing cell is drawn
    pub rounding: RoundingPolicy,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Constant driving speed used to turn driving hours into miles
    pub avg_speed_mph: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api: ApiConfig {
                base_url: "http://localhost:8000".to_string(),
                timeout_secs: 120,
            },
            retry: RetryPolicy::default(),
            grid: GridConfig {
                resolution_minutes: 15,
                slots_per_day: 96,
                rounding: RoundingPolicy::Truncate,
            },
            route: RouteConfig {
                avg_speed_mph: crate::route::DEFAULT_AVG_SPEED_MPH,
            },
        }
    }
}

impl GridConfig {
    pub fn spec(&self) -> GridSpec {
        GridSpec {
            resolution_minutes: self.resolution_minutes,
            slots_per_day: self.slots_per_day,
            rounding: self.rounding,
        }
    }
}

impl Config {
    /// Load configuration from trip-config.toml file
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        let mut config = Self::load_from_path(CONFIG_FILE);
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                config.api.base_url = url;
            }
        }
        config
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!(base_url = %config.api.base_url, "loaded configuration");
                    config
                }
                Err(e) => {
                    warn!("invalid config file format: {e}");
                    warn!("using default configuration");
                    Self::default()
                }
            },
            Err(_) => {
                info!("no config file found, using default configuration");
                Self::default()
            }
        }
    }

    /// Save current configuration to the given path
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        info!(path = %path.as_ref().display(), "configuration saved");
        Ok(())
    }

    /// Save current configuration to trip-config.toml
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to_path(CONFIG_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.timeout_secs, 120);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.retry.max_delay_ms, 5000);
        assert_eq!(config.grid.slots_per_day, 96);
        assert_eq!(config.grid.rounding, RoundingPolicy::Truncate);
        assert_eq!(config.route.avg_speed_mph, 60.0);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let config = Config::load_from_path("/nonexistent/path");
        // Should fallback to default
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_custom_file() {
        let file = NamedTempFile::new().unwrap();
        let contents = r#"
[api]
base_url = "https://trips.example.com"
timeout_secs = 30

[retry]
max_attempts = 5
base_delay_ms = 250
max_delay_ms = 2000

[grid]
resolution_minutes = 15
slots_per_day = 96
rounding = "inclusive_ceil"

[route]
avg_speed_mph = 55.0
"#;
        fs::write(file.path(), contents).unwrap();

        let config = Config::load_from_path(file.path());
        assert_eq!(config.api.base_url, "https://trips.example.com");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.grid.rounding, RoundingPolicy::InclusiveCeil);
        assert_eq!(config.route.avg_speed_mph, 55.0);
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "[api\nbase_url = ").unwrap();
        assert_eq!(Config::load_from_path(file.path()), Config::default());
    }

    #[test]
    fn test_save_then_load() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.retry.max_attempts = 7;
        config.save_to_path(file.path()).unwrap();

        let loaded = Config::load_from_path(file.path());
        assert_eq!(loaded.retry.max_attempts, 7);
    }
}
