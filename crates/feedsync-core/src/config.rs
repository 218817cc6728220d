//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/feedsync/config.toml)
//! 3. Environment variables (FEEDSYNC_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::sync::DEFAULT_PAGE_SIZE;

/// Environment variable prefix
const ENV_PREFIX: &str = "FEEDSYNC";

/// Default upstream endpoint
pub const DEFAULT_SOURCE_URL: &str = "https://newsapi.org/v2/top-headlines?country=us";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for persisted data (cached feed, annotations)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Headlines endpoint; paging parameters are appended
    #[serde(default = "default_source_url")]
    pub source_url: String,

    /// API key sent with every request (optional)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Items requested per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Per-request timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Delay between reachability probes in `watch`
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,

    /// Write logs here instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            source_url: default_source_url(),
            api_key: None,
            page_size: default_page_size(),
            request_timeout_secs: default_request_timeout_secs(),
            probe_interval_secs: default_probe_interval_secs(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (FEEDSYNC_DATA_DIR, FEEDSYNC_SOURCE_URL,
    ///    FEEDSYNC_API_KEY, FEEDSYNC_PAGE_SIZE)
    /// 2. Config file (~/.config/feedsync/config.toml or FEEDSYNC_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // FEEDSYNC_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // FEEDSYNC_SOURCE_URL
        if let Ok(val) = std::env::var(format!("{}_SOURCE_URL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.source_url = val;
            }
        }

        // FEEDSYNC_API_KEY
        if let Ok(val) = std::env::var(format!("{}_API_KEY", ENV_PREFIX)) {
            self.api_key = if val.is_empty() { None } else { Some(val) };
        }

        // FEEDSYNC_PAGE_SIZE
        if let Ok(val) = std::env::var(format!("{}_PAGE_SIZE", ENV_PREFIX)) {
            if let Ok(size) = val.trim().parse::<u32>() {
                if size > 0 {
                    self.page_size = size;
                }
            }
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Set a field by its config-file name
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "data_dir" => self.data_dir = PathBuf::from(value),
            "source_url" => {
                anyhow::ensure!(!value.is_empty(), "source_url cannot be empty");
                self.source_url = value.to_string();
            }
            "api_key" => {
                self.api_key = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                }
            }
            "page_size" => {
                let size: u32 = value
                    .parse()
                    .with_context(|| format!("Invalid page_size: {}", value))?;
                anyhow::ensure!(size > 0, "page_size must be positive");
                self.page_size = size;
            }
            "request_timeout_secs" => {
                self.request_timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid request_timeout_secs: {}", value))?;
            }
            "probe_interval_secs" => {
                self.probe_interval_secs = value
                    .parse()
                    .with_context(|| format!("Invalid probe_interval_secs: {}", value))?;
            }
            "log_file" => {
                self.log_file = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                }
            }
            other => anyhow::bail!("Unknown config key: {}", other),
        }
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with FEEDSYNC_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("feedsync")
            .join("config.toml")
    }

    /// Directory holding the key/value store blobs
    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join("store")
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("feedsync")
}

fn default_source_url() -> String {
    DEFAULT_SOURCE_URL.to_string()
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_probe_interval_secs() -> u64 {
    5
}
