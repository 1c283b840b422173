//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings.
//! Configuration is loaded from a TOML file; every section is optional.
//! `PULSEWIRE_DATABASE_URL` and `PULSEWIRE_WS_URL` override the file.
//!
//! # Example
//!
//! ```no_run
//! use pulsewire::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("pulsewire.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;

use serde::Deserialize;
use url::Url;

use super::connection::ConnectionConfig;
use super::database::DatabaseConfig;
use super::logging::LoggingConfig;
use super::retention::RetentionConfig;
use super::stream::StreamConfig;
use crate::error::{ConfigError, Result};

/// Environment variable overriding `[database] url`.
pub const DATABASE_URL_ENV: &str = "PULSEWIRE_DATABASE_URL";

/// Environment variable overriding `[connection] url`.
pub const WS_URL_ENV: &str = "PULSEWIRE_WS_URL";

/// Default configuration file name.
pub const DEFAULT_CONFIG_PATH: &str = "pulsewire.toml";

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    /// Dashboard feed connection and reconnect policy.
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Realtime metric stream bounds.
    #[serde(default)]
    pub stream: StreamConfig,

    #[serde(default)]
    pub retention: RetentionConfig,
}

impl Config {
    /// Parse configuration from TOML content, apply environment overrides,
    /// and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML is malformed,
    /// or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Load `path` if it exists, otherwise start from defaults.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load) when the file exists; otherwise only
    /// validation of the overridden defaults can fail.
    #[allow(clippy::result_large_err)]
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            return Self::load(path);
        }
        Self::parse_toml("")
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.database.url = url;
            }
        }
        if let Ok(url) = std::env::var(WS_URL_ENV) {
            if !url.trim().is_empty() {
                self.connection.url = url;
            }
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] or [`ConfigError::InvalidValue`]
    /// naming the first offending field.
    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "database.url",
            }
            .into());
        }
        if self.database.pool_size == 0 {
            return Err(invalid("database.pool_size", "must be greater than 0"));
        }

        let conn = &self.connection;
        if conn.url.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "connection.url",
            }
            .into());
        }
        let url = Url::parse(&conn.url).map_err(|e| ConfigError::InvalidValue {
            field: "connection.url",
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(invalid("connection.url", "scheme must be ws or wss"));
        }
        for (field, value) in [
            ("connection.connect_timeout_ms", conn.connect_timeout_ms),
            ("connection.close_grace_ms", conn.close_grace_ms),
            ("connection.heartbeat_interval_ms", conn.heartbeat_interval_ms),
            ("connection.backoff_base_ms", conn.backoff_base_ms),
        ] {
            if value == 0 {
                return Err(invalid(field, "must be greater than 0"));
            }
        }

        if self.stream.max_len == 0 {
            return Err(invalid("stream.max_len", "must be greater than 0"));
        }
        if self.retention.batch_size == 0 {
            return Err(invalid("retention.batch_size", "must be greater than 0"));
        }

        Ok(())
    }

    /// Initialize tracing from the `[logging]` section.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

fn invalid(field: &'static str, reason: &str) -> crate::error::Error {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
    .into()
}
