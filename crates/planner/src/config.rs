/// Runtime configuration for the planner service
use crate::api::ApiClientConfig;
use crate::enumerate::EnumerateOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_PATH_VAR: &str = "PLANNER_CONFIG";
const API_URL_VAR: &str = "PLANNER_API_URL";
const ADDRESS_VAR: &str = "PLANNER_ADDRESS";
const PORT_VAR: &str = "PLANNER_PORT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config file {path}: {message}")]
    Io { path: String, message: String },

    #[error("Could not parse config file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Service settings. Every field has a default, so an empty JSON object is a
/// valid config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Base URL of the course-data API
    pub api_base_url: String,
    pub address: String,
    pub port: u16,
    /// Default tracing filter, used when `RUST_LOG` is unset
    pub log_level: String,
    pub cache_ttl_secs: u64,
    pub request_timeout_secs: u64,
    /// Most combinations returned for one timetable request
    pub max_combinations: usize,
    /// Most combinations generated for one timetable request, kept or not
    pub max_examined: u64,
    /// Row height of text calendars
    pub calendar_slot_minutes: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            api_base_url: ApiClientConfig::default().base_url,
            address: "127.0.0.1".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            cache_ttl_secs: 600,
            request_timeout_secs: 30,
            max_combinations: 10_000,
            max_examined: 1_000_000,
            calendar_slot_minutes: 30,
        }
    }
}

impl PlannerConfig {
    /// Loads a config from a JSON file.
    ///
    /// # Arguments
    /// * `path` - Path to the JSON config file
    ///
    /// # Returns
    /// * `Ok(PlannerConfig)` - Parsed config; missing fields take defaults
    /// * `Err(ConfigError)` - If the file can't be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Builds the config for a process: the file at `path` if given
    /// (otherwise defaults), then environment overrides.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Applies `PLANNER_API_URL`, `PLANNER_ADDRESS` and `PLANNER_PORT` as
    /// returned by `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = lookup(API_URL_VAR) {
            self.api_base_url = url;
        }
        if let Some(address) = lookup(ADDRESS_VAR) {
            self.address = address;
        }
        if let Some(port) = lookup(PORT_VAR) {
            self.port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: PORT_VAR.to_string(),
                value: port,
            })?;
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn to_api_config(&self) -> ApiClientConfig {
        ApiClientConfig {
            base_url: self.api_base_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            ..ApiClientConfig::default()
        }
    }

    pub fn enumerate_options(&self) -> EnumerateOptions {
        EnumerateOptions {
            valid_only: false,
            limit: Some(self.max_combinations),
            max_examined: Some(self.max_examined),
        }
    }
}
