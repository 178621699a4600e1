//! # secretshift
//!
//! Moves secret records between a locally persisted SQL store and a remote
//! secrets manager plugin, keeping track of whether a failed plugin start
//! should abort the application.
//!
//! ## Architecture
//!
//! ```text
//! Settings ──► SecretMigrator ──► RemoteSecretsPluginCheck
//!                   │    │
//!                   │    └──────► SecretsKvStore (local SQL | remote plugin)
//!                   ▼
//!          KvStore (plugin startup fatality flag)
//! ```
//!
//! ## Core Components
//!
//! - **Secret stores**: [`secrets::SqlSecretsKvStore`] and [`secrets::PluginSecretsKvStore`]
//!   behind one [`secrets::SecretsKvStore`] trait
//! - **Migrator**: [`SecretMigrator`], run once at startup
//! - **Key-value area**: [`kvstore::KvStore`] for small internal state
//! - **Persistence**: SQLx with SQLite and embedded schema migrations
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use secretshift::{storage, Settings, SecretMigrator};
//!
//! let settings = Settings::load(Some(Path::new("secretshift.toml")))?;
//! secretshift::observability::init_logging(&settings.log)?;
//! let pool = storage::create_pool(&settings.database).await?;
//! // build the stores and the availability check, then:
//! let report = migrator.migrate().await?;
//! ```

pub mod config;
pub mod errors;
pub mod kvstore;
pub mod observability;
pub mod secrets;
pub mod storage;

// Re-export commonly used types and traits
pub use config::{MigrationSettings, Settings};
pub use errors::{Error, Result};
pub use observability::init_logging;
pub use secrets::{MigrationDirection, MigrationReport, SecretMigrator};
