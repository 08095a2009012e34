//! `metacat` configuration module.
//!
//! Provides configuration file support via `metacat.toml`, environment
//! variables, and runtime overrides. The loaded value is handed to the
//! store constructor; nothing here is global.
//!
//! # Priority (highest to lowest)
//!
//! 1. Runtime overrides (struct fields set by the caller)
//! 2. Environment variables (`METACAT_*`)
//! 3. Configuration file (`metacat.toml`)
//! 4. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to parse configuration.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue {
        /// Configuration key that failed validation.
        key: String,
        /// Validation error message.
        message: String,
    },
}

/// Storage operations section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Issue a soft commit with every create/update so writes are visible
    /// to the next read. When false the backend's own commit policy applies.
    pub forced_auto_commit: bool,
    /// Source identifier stamped on records written and read by this store.
    pub local_source_id: String,
    /// Row count used when a query asks for "no page size".
    pub max_rows: usize,
    /// Enables XPath predicates. When false they report unsupported.
    pub xpath_enabled: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            forced_auto_commit: false,
            local_source_id: "metacat".to_string(),
            max_rows: 2_147_483_647,
            xpath_enabled: true,
        }
    }
}

/// Solr connection section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolrConfig {
    /// Base URL of the Solr web application.
    pub url: String,
    /// Core (or collection) holding the catalog.
    pub core: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for SolrConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8983/solr".to_string(),
            core: "catalog".to_string(),
            timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace.
    pub level: String,
    /// Log format: text or json.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Main `metacat` configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CatalogConfig {
    /// Storage operations configuration.
    pub store: StoreConfig,
    /// Solr connection configuration.
    pub solr: SolrConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl CatalogConfig {
    /// Loads configuration from default sources.
    ///
    /// Priority: defaults < file < environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing fails.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("metacat.toml")
    }

    /// Loads configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing fails.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("METACAT_").split("__"));

        figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Creates a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::string(toml_str));

        figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.max_rows == 0 {
            return Err(ConfigError::InvalidValue {
                key: "store.max_rows".to_string(),
                message: "value must be >= 1".to_string(),
            });
        }

        if self.store.local_source_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "store.local_source_id".to_string(),
                message: "value must not be empty".to_string(),
            });
        }

        if !(self.solr.url.starts_with("http://") || self.solr.url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                key: "solr.url".to_string(),
                message: format!("'{}' must use the http or https scheme", self.solr.url),
            });
        }

        if self.solr.core.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "solr.core".to_string(),
                message: "value must not be empty".to_string(),
            });
        }

        if self.solr.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "solr.timeout_ms".to_string(),
                message: "value must be > 0".to_string(),
            });
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                message: format!(
                    "value '{}' is invalid, expected one of: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.format".to_string(),
                message: format!(
                    "value '{}' is invalid, expected one of: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        Ok(())
    }

    /// Serializes the configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}
