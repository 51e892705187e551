//! Configuration management for evidencelink.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "evidencelink";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "evidence.db";

/// Identity recorded when no user name can be determined.
pub const UNKNOWN_USER: &str = "Unknown";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `EVIDENCELINK_`, `__` between sections)
/// 2. TOML config file at `~/.config/evidencelink/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Identity of the person linking evidence.
    pub user: UserConfig,
    /// External analysis service configuration.
    pub analysis: AnalysisConfig,
    /// Objective catalog configuration.
    pub catalog: CatalogConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/evidencelink/evidence.db`
    pub database_path: Option<PathBuf>,
}

/// User identity configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Name written to `linkedBy` on new quotes.
    /// Falls back to `$USER`, then `"Unknown"`.
    pub name: Option<String>,
}

/// Analysis service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Messages endpoint URL.
    pub endpoint: String,
    /// Model identifier sent with each request.
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Value of the API version header.
    pub api_version: String,
    /// Maximum tokens requested for the response.
    pub max_tokens: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Transcripts shorter than this (in characters, trimmed) are rejected.
    pub min_transcript_chars: usize,
}

/// Objective catalog configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Path to a JSON catalog of objectives (family -> control -> objective -> text).
    pub path: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            model: "claude-3-5-sonnet-latest".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            api_version: "2023-06-01".to_string(),
            max_tokens: 4096,
            timeout_secs: 120,
            min_transcript_chars: 50,
        }
    }
}

impl AnalysisConfig {
    /// Request timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration, reading the TOML file at `config_path` or the
    /// default location.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("EVIDENCELINK_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let analysis = &self.analysis;

        if !(analysis.endpoint.starts_with("https://") || analysis.endpoint.starts_with("http://"))
        {
            return Err(Error::ConfigValidation {
                message: format!(
                    "analysis.endpoint must be an http(s) URL, got '{}'",
                    analysis.endpoint
                ),
            });
        }

        if analysis.model.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "analysis.model must not be empty".to_string(),
            });
        }

        if analysis.max_tokens == 0 {
            return Err(Error::ConfigValidation {
                message: "analysis.max_tokens must be greater than 0".to_string(),
            });
        }

        if analysis.timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "analysis.timeout_secs must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Resolve the identity recorded as `linkedBy`.
    #[must_use]
    pub fn user_name(&self) -> String {
        self.user
            .name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| std::env::var("USER").ok().filter(|u| !u.is_empty()))
            .unwrap_or_else(|| UNKNOWN_USER.to_string())
    }
}
