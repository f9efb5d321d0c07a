//! Client configuration management.
//!
//! Handles loading of client configuration from TOML files
//! with environment variable override support.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default collaborator address
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

/// Default polling period for both views
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

/// Shortest accepted poll period
pub const MIN_POLL_INTERVAL_MS: u64 = 250;
const MAX_POLL_INTERVAL_MS: u64 = 3_600_000;

/// How concurrent fetch results are reconciled when they race.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FetchOrdering {
    /// The last response to arrive wins, regardless of when it was issued
    #[default]
    Arrival,
    /// Responses older than the newest applied one are dropped
    Issuance,
}

impl FetchOrdering {
    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "arrival" => Some(Self::Arrival),
            "issuance" => Some(Self::Issuance),
            _ => None,
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the queue service, including any path prefix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Polling period in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Where the session credential is persisted
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Optional log file (the terminal UI cannot log to stdout)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Race policy between timer-driven and command-driven fetches
    #[serde(default)]
    pub fetch_ordering: FetchOrdering,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_session_file() -> PathBuf {
    PathBuf::from(".queue/session.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            session_file: default_session_file(),
            log_level: default_log_level(),
            log_file: None,
            fetch_ordering: FetchOrdering::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from `path`, or the defaults when the file is absent
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Apply environment variable overrides
    pub fn with_env_override(mut self) -> Self {
        if let Ok(base_url) = std::env::var("QUEUE_API_URL") {
            self.base_url = base_url;
        }

        if let Ok(interval) = std::env::var("QUEUE_POLL_INTERVAL_MS") {
            if let Ok(ms) = interval.parse() {
                self.poll_interval_ms = ms;
            }
        }

        if let Ok(timeout) = std::env::var("QUEUE_REQUEST_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                self.request_timeout_ms = ms;
            }
        }

        if let Ok(session_file) = std::env::var("QUEUE_SESSION_FILE") {
            self.session_file = PathBuf::from(session_file);
        }

        if let Ok(log_level) = std::env::var("QUEUE_LOG_LEVEL") {
            self.log_level = log_level;
        }

        if let Ok(log_file) = std::env::var("QUEUE_LOG_FILE") {
            self.log_file = Some(PathBuf::from(log_file));
        }

        if let Ok(ordering) = std::env::var("QUEUE_FETCH_ORDERING") {
            self.fetch_ordering = FetchOrdering::parse(&ordering).unwrap_or(self.fetch_ordering);
        }

        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            errors.push(format!(
                "Invalid base_url '{}'. Must start with http:// or https://",
                self.base_url
            ));
        } else if let Err(e) = reqwest::Url::parse(&self.base_url) {
            errors.push(format!("Invalid base_url '{}': {}", self.base_url, e));
        }

        if !(MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS).contains(&self.poll_interval_ms) {
            errors.push(format!(
                "poll_interval_ms {} must be between {} and {}",
                self.poll_interval_ms, MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS
            ));
        }

        if self.request_timeout_ms == 0 {
            errors.push("request_timeout_ms must be greater than 0".to_string());
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.to_lowercase().as_str()) {
            errors.push(format!(
                "Invalid log_level '{}'. Valid values: {:?}",
                self.log_level, valid_log_levels
            ));
        }

        if self.session_file.as_os_str().is_empty() {
            errors.push("session_file cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load from file (or defaults) with environment overrides and validate
    pub fn load_with_env_and_validate(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load_or_default(path)?.with_env_override();
        config.validate()?;
        Ok(config)
    }

    /// Polling period as a [`Duration`]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Request timeout as a [`Duration`]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Configuration error type
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("IO error: {0}")]
    Io(String),
    /// Parse error in config file
    #[error("Parse error: {0}")]
    Parse(String),
    /// Validation error
    #[error("Validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8080/api");
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.fetch_ordering, FetchOrdering::Arrival);
    }

    #[test]
    fn test_default_config_validates() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let config = ClientConfig {
            base_url: "ftp://queue".to_string(),
            poll_interval_ms: 10,
            request_timeout_ms: 0,
            log_level: "loud".to_string(),
            ..ClientConfig::default()
        };

        match config.validate() {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 4),
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
base_url = "https://clinic.example/api"
poll_interval_ms = 2000
fetch_ordering = "issuance"
"#
        )
        .unwrap();

        let config = ClientConfig::load(file.path()).unwrap();
        assert_eq!(config.base_url, "https://clinic.example/api");
        assert_eq!(config.poll_interval_ms, 2000);
        assert_eq!(config.fetch_ordering, FetchOrdering::Issuance);
        // Unspecified fields keep their defaults
        assert_eq!(config.request_timeout_ms, 10_000);
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::load_or_default(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "poll_interval_ms = \"soon\"").unwrap();
        assert!(matches!(
            ClientConfig::load(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("QUEUE_FETCH_ORDERING", "issuance");
        let config = ClientConfig::default().with_env_override();
        assert_eq!(config.fetch_ordering, FetchOrdering::Issuance);
        std::env::remove_var("QUEUE_FETCH_ORDERING");
    }
}
