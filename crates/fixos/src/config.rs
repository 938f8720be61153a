//! Configuration management for fixos.
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
const DATA_DIR_NAME: &str = "fixos";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "fixos.db";

/// Default WhatsApp status message.
pub const DEFAULT_NOTIFY_TEMPLATE: &str = "Olá {cliente}! Sua O.S. #{os} está com status: {status}. \
     Valor: R$ {total}. {empresa}";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FIXOS_`)
/// 2. TOML config file at `~/.config/fixos/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Local storage configuration.
    pub storage: StorageConfig,
    /// Cloud mirror configuration.
    pub cloud: CloudConfig,
    /// Postal code lookup configuration.
    pub lookup: LookupConfig,
    /// Generative assistant configuration.
    pub assistant: AssistantConfig,
    /// Customer notification configuration.
    pub notify: NotifyConfig,
    /// Dashboard configuration.
    pub dashboard: DashboardConfig,
}

/// Local storage configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/fixos/fixos.db`
    pub database_path: Option<PathBuf>,
}

/// Cloud mirror configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Mirror writes to the remote database and prefer it for reads.
    pub enabled: bool,
    /// `PostgreSQL` connection string.
    pub database_url: Option<String>,
    /// Maximum pooled connections.
    pub max_connections: u32,
}

/// Postal code lookup configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Base URL of the postal code service.
    pub postal_code_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

/// Generative assistant configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// API key. The assistant answers with fallback text when unset.
    pub api_key: Option<String>,
    /// Model name.
    pub model: String,
    /// Base URL of the generative API.
    pub endpoint: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

/// Customer notification configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Country calling code prefixed to local phone numbers.
    pub country_code: String,
    /// Message template. Placeholders: `{cliente}`, `{os}`, `{status}`,
    /// `{total}`, `{empresa}`.
    pub template: String,
}

/// Dashboard configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Products with stock at or below this are reported as low.
    pub low_stock_threshold: i64,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            database_url: None,
            max_connections: 5,
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            postal_code_url: "https://viacep.com.br".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-3-flash-preview".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            country_code: "55".to_string(),
            template: DEFAULT_NOTIFY_TEMPLATE.to_string(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: 3,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("FIXOS_").split("__"));

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
        if self.cloud.enabled {
            let Some(url) = self.cloud.database_url.as_deref() else {
                return Err(Error::ConfigValidation {
                    message: "cloud.enabled requires cloud.database_url".to_string(),
                });
            };
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(Error::ConfigValidation {
                    message: "cloud.database_url must be a postgres:// connection string"
                        .to_string(),
                });
            }
        }

        if self.cloud.max_connections == 0 {
            return Err(Error::ConfigValidation {
                message: "cloud.max_connections must be greater than 0".to_string(),
            });
        }

        if self.lookup.timeout_secs == 0 || self.assistant.timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "timeout_secs must be greater than 0".to_string(),
            });
        }

        if self.notify.country_code.is_empty()
            || !self.notify.country_code.chars().all(|c| c.is_ascii_digit())
        {
            return Err(Error::ConfigValidation {
                message: format!(
                    "notify.country_code must be digits only: {}",
                    self.notify.country_code
                ),
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

    /// Get the postal code lookup timeout as a Duration.
    #[must_use]
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup.timeout_secs)
    }

    /// Get the assistant timeout as a Duration.
    #[must_use]
    pub fn assistant_timeout(&self) -> Duration {
        Duration::from_secs(self.assistant.timeout_secs)
    }
}
