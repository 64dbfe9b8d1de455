//! Configuration data structures

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding the backend base URL
pub const ENV_BACKEND_URL: &str = "COLLECT_DATA_BACKEND_URL";
/// Environment variable overriding the backend API key
pub const ENV_API_KEY: &str = "COLLECT_DATA_API_KEY";
/// Environment variable overriding the handshake magic cookie
pub const ENV_MAGIC_COOKIE: &str = "COLLECT_DATA_MAGIC_COOKIE";

/// Handshake secret shared with the runner
pub const DEFAULT_MAGIC_COOKIE: &str = "alertflow-runner-plugin";
/// Protocol version implemented by this plugin
pub const PROTOCOL_VERSION: u32 = 1;

/// Errors raised while loading or saving configuration
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Failed to access configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// Logging level configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum LogLevel {
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "warn")]
    Warn,
    #[serde(rename = "info")]
    #[default]
    Info,
    #[serde(rename = "debug")]
    Debug,
    #[serde(rename = "trace")]
    Trace,
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Configuration {
    /// Base URL of the backend API
    pub backend_url: String,
    /// API key sent in the Authorization header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Per-request timeout for backend calls
    pub request_timeout_seconds: u64,
    /// Handshake secret expected from the runner
    pub magic_cookie: String,
    /// Handshake protocol version expected from the runner
    pub protocol_version: u32,
    /// How long an in-flight request may run after a shutdown signal
    pub shutdown_grace_seconds: u64,
    /// Logging verbosity level
    pub log_level: LogLevel,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:8080".to_string(),
            api_key: None,
            request_timeout_seconds: 30,
            magic_cookie: DEFAULT_MAGIC_COOKIE.to_string(),
            protocol_version: PROTOCOL_VERSION,
            shutdown_grace_seconds: 5,
            log_level: LogLevel::Info,
        }
    }
}

impl Configuration {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigurationError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
            let config: Configuration = toml::from_str(&content)?;
            Ok(config)
        } else {
            // Return default configuration if file doesn't exist
            Ok(Configuration::default())
        }
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigurationError> {
        let content = toml::to_string_pretty(self)?;
        let io_error = |source| ConfigurationError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        std::fs::write(path, content).map_err(io_error)?;
        Ok(())
    }

    /// Get the XDG config directory path
    pub fn default_config_path() -> Result<PathBuf, ConfigurationError> {
        let config_dir = dirs::config_dir().ok_or(ConfigurationError::NoConfigDir)?;
        Ok(config_dir.join("collect-data").join("config.toml"))
    }

    /// Apply overrides from an injectable environment lookup
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = present(ENV_BACKEND_URL) {
            self.backend_url = url;
        }
        if let Some(key) = present(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(cookie) = present(ENV_MAGIC_COOKIE) {
            self.magic_cookie = cookie;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        match url::Url::parse(&self.backend_url) {
            Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => {}
            Ok(parsed) => errors.push(format!(
                "backend_url must use http or https, got {}",
                parsed.scheme()
            )),
            Err(e) => errors.push(format!("backend_url is not a valid URL: {}", e)),
        }

        if self.request_timeout_seconds == 0 || self.request_timeout_seconds > 300 {
            errors.push("request_timeout_seconds must be between 1 and 300".to_string());
        }

        if self.shutdown_grace_seconds > 60 {
            errors.push("shutdown_grace_seconds cannot exceed 60".to_string());
        }

        if self.magic_cookie.trim().is_empty() {
            errors.push("magic_cookie cannot be empty".to_string());
        }

        if self.protocol_version == 0 {
            errors.push("protocol_version must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
