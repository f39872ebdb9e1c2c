//! Tracer configuration
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables, since the tracer usually runs inside a process it does not
//! control the command line of:
//!
//! - `CALLSIFT_LOG_DIR`: directory for per-process call logs
//! - `CALLSIFT_LOG_PREFIX`: file name prefix, logs are `<prefix>_<pid>.log`
//! - `CALLSIFT_LOG_DEFINITIONS`: `0`/`false` to skip `Function` lines

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_LOG_DIR: &str = "CALLSIFT_LOG_DIR";
pub const ENV_LOG_PREFIX: &str = "CALLSIFT_LOG_PREFIX";
pub const ENV_LOG_DEFINITIONS: &str = "CALLSIFT_LOG_DEFINITIONS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("Invalid log prefix {0:?}: must be non-empty and contain no path separator")]
    InvalidPrefix(String),
}

/// Configuration for the function tracer tool
///
/// # Example
/// ```
/// use callsift::config::TracerConfig;
///
/// let config = TracerConfig::default();
/// assert_eq!(config.log_prefix, "callsift");
/// assert!(config.log_definitions);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TracerConfig {
    /// Directory where `<prefix>_<pid>.log` files are created
    pub log_dir: PathBuf,

    /// Log file name prefix
    pub log_prefix: String,

    /// Write a `Function` line for every relevant routine at image load.
    /// The coverage report needs these to know what was never called.
    pub log_definitions: bool,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("."),
            log_prefix: "callsift".to_string(),
            log_definitions: true,
        }
    }
}

impl TracerConfig {
    /// Load a TOML config file; missing keys take their defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults overridden by the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Apply `CALLSIFT_*` environment overrides on top of `self`
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(dir) = std::env::var(ENV_LOG_DIR) {
            self.log_dir = PathBuf::from(dir);
        }

        if let Ok(prefix) = std::env::var(ENV_LOG_PREFIX) {
            self.log_prefix = prefix;
        }

        if let Ok(value) = std::env::var(ENV_LOG_DEFINITIONS) {
            self.log_definitions = parse_bool(&value).ok_or(ConfigError::InvalidEnv {
                var: ENV_LOG_DEFINITIONS,
                value,
            })?;
        }

        Ok(self)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_prefix.is_empty() || self.log_prefix.contains(['/', '\\']) {
            return Err(ConfigError::InvalidPrefix(self.log_prefix.clone()));
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
