//! # Configuration Settings
//!
//! Defines the configuration structure for secretshift.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Prefix for environment overrides, e.g. `SECRETSHIFT_SECRETS__MIGRATE_TO_PLUGIN`
pub const ENV_PREFIX: &str = "SECRETSHIFT";

/// Separator between section and key in environment overrides
pub const ENV_SEPARATOR: &str = "__";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Secret store and migration switches
    pub secrets: SecretsConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Logging configuration
    pub log: LogConfig,
}

impl Settings {
    /// Load settings from defaults, an optional TOML file and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from_sources(path, None)
    }

    /// Load settings, reading environment overrides from `env` instead of the
    /// process environment when given.
    pub fn load_from_sources(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path).format(config::FileFormat::Toml).required(true),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator(ENV_SEPARATOR)
                .try_parsing(true)
                .source(env),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;

        tracing::debug!(
            migrate_to_plugin = settings.secrets.migrate_to_plugin,
            migrate_from_plugin = settings.secrets.migrate_from_plugin,
            use_plugin = settings.secrets.use_plugin,
            "Loaded settings"
        );

        Ok(settings)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        self.database.validate()?;

        if self.log.level.trim().is_empty() {
            return Err(Error::validation("log level cannot be empty"));
        }

        Ok(())
    }

    /// Migration switches read once by the migrator at construction
    pub fn migration(&self) -> MigrationSettings {
        MigrationSettings {
            migrate_to_plugin: self.secrets.migrate_to_plugin,
            migrate_from_plugin: self.secrets.migrate_from_plugin,
        }
    }
}

/// `[secrets]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SecretsConfig {
    /// Move secrets from the local store into the plugin when the plugin is authoritative
    pub migrate_to_plugin: bool,

    /// Copy secrets from the plugin back into the local store when it is not authoritative
    pub migrate_from_plugin: bool,

    /// Treat the remote plugin as the secret store whenever one is installed
    pub use_plugin: bool,
}

/// The two migration switches, detached from the rest of the settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationSettings {
    pub migrate_to_plugin: bool,
    pub migrate_from_plugin: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connect_timeout_seconds: u64,

    /// Idle timeout in seconds (0 = no timeout)
    pub idle_timeout_seconds: u64,

    /// Enable automatic migrations
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/secretshift.db".to_string(),
            max_connections: 10,
            min_connections: 0,
            connect_timeout_seconds: 10,
            idle_timeout_seconds: 600, // 10 minutes
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    /// Get connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Get idle timeout as Duration (None if 0)
    pub fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.idle_timeout_seconds))
        }
    }

    /// Check if this is a SQLite configuration
    pub fn is_sqlite(&self) -> bool {
        self.url.starts_with("sqlite:")
    }

    /// Validate pool sizing and URL scheme
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(Error::validation("database URL cannot be empty"));
        }

        if !self.is_sqlite() {
            return Err(Error::validation("database URL must start with 'sqlite:'"));
        }

        if self.max_connections == 0 {
            return Err(Error::validation("max_connections must be greater than 0"));
        }

        if self.min_connections > self.max_connections {
            return Err(Error::validation(
                "min_connections cannot be greater than max_connections",
            ));
        }

        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}
