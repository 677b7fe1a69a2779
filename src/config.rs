//! Configuration loading and management for briefing.
//!
//! Loads settings from `briefing.toml` with an environment variable override
//! for the feed's base URL. Every key is optional.

use crate::loader::REQUEST_TIMEOUT;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding `source.base_url`
pub const BASE_URL_ENV: &str = "BRIEFING_BASE_URL";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("invalid data location '{location}': {reason}")]
    InvalidLocation { location: String, reason: String },
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Where the briefing payloads are fetched from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL the locations are joined onto; local files when unset
    pub base_url: Option<String>,
    /// Live payload location
    pub primary: String,
    /// Bundled sample payload location
    pub fallback: String,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            primary: "data/latest.json".to_string(),
            fallback: "data/sample.json".to_string(),
            timeout_secs: REQUEST_TIMEOUT.as_secs(),
        }
    }
}

impl SourceConfig {
    /// Parsed base URL, if one is configured
    pub fn base_url(&self) -> Result<Option<Url>, ConfigError> {
        let Some(raw) = self.base_url.as_deref().filter(|s| !s.trim().is_empty()) else {
            return Ok(None);
        };

        // Without a trailing slash `join` would replace the last path segment
        let normalized = if raw.ends_with('/') {
            raw.to_string()
        } else {
            format!("{}/", raw)
        };

        Url::parse(&normalized)
            .map(Some)
            .map_err(|e| ConfigError::InvalidLocation {
                location: raw.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Which layout the articles are shown in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    /// Flat list, newest first
    #[default]
    List,
    /// Grouped by vertical, then compliance focus
    Grouped,
}

impl View {
    pub fn toggled(self) -> Self {
        match self {
            View::List => View::Grouped,
            View::Grouped => View::List,
        }
    }
}

/// Display preferences
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub view: View,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Log file for the terminal UI
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Log file used while the terminal UI owns the screen
    pub fn ui_log_file(&self) -> PathBuf {
        self.file
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("briefing.log"))
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location, or defaults if none exists
    pub fn load() -> Result<Self, ConfigError> {
        match Self::find_config_file() {
            Some(path) => Self::load_from(&path),
            None => {
                let mut config = Config::default();
                config.apply_env();
                Ok(config)
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&content)?;
        config.apply_env();
        Ok(config)
    }

    /// Parse configuration text without consulting the environment
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Override the base URL from the environment
    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.source.base_url = Some(url);
            }
        }
    }

    /// Find the config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        // Check current directory first
        let local_config = PathBuf::from("briefing.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        // Check home directory
        let home_config = dirs::home_dir()?
            .join(".config")
            .join("briefing")
            .join("briefing.toml");
        home_config.exists().then_some(home_config)
    }
}
