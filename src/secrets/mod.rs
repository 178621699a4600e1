//! Secret stores and the migration between them.
//!
//! Secrets are addressed by `(org_id, namespace, secret_type)` and live in one
//! of two interchangeable backends behind the [`SecretsKvStore`] trait:
//!
//! - [`SqlSecretsKvStore`]: the local SQL table, encrypted at rest through a
//!   [`SecretsService`], with a per-organization decryption cache
//! - [`PluginSecretsKvStore`]: the remote secrets manager plugin, reached
//!   through a [`SecretsManagerPlugin`] client
//!
//! [`SecretMigrator`] moves records toward whichever backend is about to be
//! authoritative, and keeps the plugin startup fatality flag (see [`fatal`])
//! consistent with how far a migration got.
//!
//! # Example
//!
//! ```rust,ignore
//! use secretshift::secrets::{
//!     ConfiguredPluginCheck, SecretMigrator, SqlLocalStoreFactory, SqlSecretsKvStore,
//! };
//! use std::sync::Arc;
//!
//! let local_stores = Arc::new(SqlLocalStoreFactory::new(pool.clone(), cipher.clone()));
//! let check = Arc::new(ConfiguredPluginCheck::from_config(&settings.secrets, starter));
//! let kv = Arc::new(SqlKvStore::new(pool.clone()));
//!
//! let migrator = SecretMigrator::new(secrets_store, settings.migration(), local_stores, check, kv);
//! let report = migrator.migrate().await?;
//! ```
//!
//! # Security Considerations
//!
//! - Secret values are wrapped in [`SecretString`], which redacts itself in
//!   `Debug`/`Display` and zeroes its buffer on drop
//! - Values are never written to logs or error messages

pub mod check;
pub mod fatal;
pub mod migration;
pub mod plugin;
pub mod service;
pub mod sql;
pub mod store;
pub mod types;

pub use check::{ConfiguredPluginCheck, PluginStarter, RemoteSecretsPluginCheck};
pub use fatal::{
    is_plugin_startup_error_fatal, plugin_kv_store, set_plugin_startup_error_fatal,
    PLUGIN_NAMESPACE, QUIT_ON_PLUGIN_STARTUP_FAILURE_KEY,
};
pub use migration::{MigrationDirection, MigrationReport, SecretMigrator};
pub use plugin::{
    DeleteSecretRequest, GetSecretRequest, GetSecretResponse, ListSecretsRequest,
    ListSecretsResponse, PluginResponse, PluginSecretsKvStore, RenameSecretRequest,
    SecretsManagerPlugin, SetSecretRequest,
};
pub use service::SecretsService;
pub use sql::{SqlLocalStoreFactory, SqlSecretsKvStore};
pub use store::{LocalSecretsStore, LocalStoreFactory, SecretsKvStore};
pub use types::{Item, SecretKey, SecretString};
