//! # Configuration Management
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `SECRETSHIFT_<SECTION>__<KEY>` environment overrides.

pub mod settings;

pub use settings::{
    DatabaseConfig, LogConfig, MigrationSettings, SecretsConfig, Settings, ENV_PREFIX,
    ENV_SEPARATOR,
};
