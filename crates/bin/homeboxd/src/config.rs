//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `homebox.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use homebox_app::registry::RegistryConfig;
use homebox_domain::id::DriverId;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Which drivers to load, and their settings.
    pub drivers: DriversConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Driver selection.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DriversConfig {
    /// Driver ids to load, in order.
    pub enabled: Vec<String>,
    /// Keep running when a driver fails to load or start.
    pub skip_failed: bool,
    /// Free-form settings table per driver id.
    pub settings: BTreeMap<String, toml::Value>,
}

impl Config {
    /// Load configuration from `homebox.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("homebox.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HOMEBOX_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("HOMEBOX_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("HOMEBOX_BIND") {
            if let Some((host, port)) = val.rsplit_once(':') {
                self.server.host = host.to_string();
                if let Ok(port) = port.parse() {
                    self.server.port = port;
                }
            }
        }
        if let Ok(val) = std::env::var("HOMEBOX_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("HOMEBOX_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        let mut seen = BTreeSet::new();
        for id in &self.drivers.enabled {
            if id.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "enabled driver ids must not be empty".to_string(),
                ));
            }
            if !seen.insert(id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "driver `{id}` is enabled twice"
                )));
            }
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    /// The driver registry input: enabled ids plus their settings as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for a blank driver id, or
    /// [`ConfigError::Settings`] if a settings table cannot be expressed as
    /// JSON.
    pub fn registry_config(&self) -> Result<RegistryConfig, ConfigError> {
        let enabled = self
            .drivers
            .enabled
            .iter()
            .map(|id| {
                id.parse::<DriverId>()
                    .map_err(|err| ConfigError::Validation(err.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let settings = self
            .drivers
            .settings
            .iter()
            .map(|(id, table)| {
                let json = serde_json::to_value(table).map_err(|source| ConfigError::Settings {
                    driver: id.clone(),
                    source,
                })?;
                Ok((DriverId::new(id.as_str()), json))
            })
            .collect::<Result<BTreeMap<_, _>, ConfigError>>()?;

        Ok(RegistryConfig {
            enabled,
            skip_failed: self.drivers.skip_failed,
            settings,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:homebox.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "homeboxd=info,homebox_app=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for DriversConfig {
    fn default() -> Self {
        Self {
            enabled: vec![homebox_adapter_virtual::DRIVER_ID.to_string()],
            skip_failed: false,
            settings: BTreeMap::new(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
    /// A driver settings table that does not map to JSON.
    #[error("invalid settings for driver `{driver}`")]
    Settings {
        driver: String,
        #[source]
        source: serde_json::Error,
    },
}
