//! Configuration management for railforms.
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
const DATA_DIR_NAME: &str = "railforms";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "forms.db";

/// Upper bound on any listing window, whatever the configuration says.
pub const HARD_MAX_LIMIT: u64 = 100;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `RAILFORMS_`, `__` between levels)
/// 2. TOML config file at `~/.config/railforms/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Listing configuration.
    pub listing: ListingConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/railforms/forms.db`
    pub database_path: Option<PathBuf>,
    /// How long a writer waits for a competing transaction's lock, in
    /// milliseconds.
    pub busy_timeout_ms: u64,
}

/// Pagination limits for list operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Window size when the caller gives no limit.
    pub default_limit: u64,
    /// Largest window a caller may request; larger requests are clamped.
    pub max_limit: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None, // Will be resolved to default at runtime
            busy_timeout_ms: 5_000,
        }
    }
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_limit: HARD_MAX_LIMIT,
            max_limit: HARD_MAX_LIMIT,
        }
    }
}

impl ListingConfig {
    /// Resolve a requested limit to the window actually used.
    #[must_use]
    pub fn window(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.default_limit)
            .min(self.max_limit)
            .min(HARD_MAX_LIMIT)
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `RAILFORMS_`)
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

        let config: Config = Self::figment(config_file).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the layered figment for a config file.
    #[must_use]
    pub fn figment(config_file: PathBuf) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed("RAILFORMS_").split("__"))
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
        let listing = &self.listing;

        if listing.max_limit == 0 || listing.max_limit > HARD_MAX_LIMIT {
            return Err(Error::ConfigValidation {
                message: format!(
                    "max_limit ({}) must be between 1 and {HARD_MAX_LIMIT}",
                    listing.max_limit
                ),
            });
        }

        if listing.default_limit == 0 || listing.default_limit > listing.max_limit {
            return Err(Error::ConfigValidation {
                message: format!(
                    "default_limit ({}) must be between 1 and max_limit ({})",
                    listing.default_limit, listing.max_limit
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

    /// Get the busy timeout as a Duration.
    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.storage.busy_timeout_ms)
    }
}
