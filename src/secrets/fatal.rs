//! Persisted switch deciding whether a failed plugin start aborts startup.
//!
//! The flag lives in the generic key-value area, not with the secrets. It is
//! fatal exactly when the key exists; clearing it deletes the key.

use crate::errors::Result;
use crate::kvstore::{KvStore, NamespacedKvStore, ALL_ORGANIZATIONS};
use std::sync::Arc;
use tracing::{debug, info};

pub const PLUGIN_NAMESPACE: &str = "secretsmanagerplugin";
pub const QUIT_ON_PLUGIN_STARTUP_FAILURE_KEY: &str = "quit_on_secrets_plugin_startup_failure";

/// Key-value handle for the plugin's namespace.
pub fn plugin_kv_store(kv: Arc<dyn KvStore>) -> NamespacedKvStore {
    NamespacedKvStore::new(kv, ALL_ORGANIZATIONS, PLUGIN_NAMESPACE)
}

/// Whether a plugin startup failure should stop the process.
pub async fn is_plugin_startup_error_fatal(kv: &NamespacedKvStore) -> Result<bool> {
    let fatal = kv.get(QUIT_ON_PLUGIN_STARTUP_FAILURE_KEY).await?.is_some();
    debug!(fatal, "Read plugin startup fatality flag");
    Ok(fatal)
}

pub async fn set_plugin_startup_error_fatal(kv: &NamespacedKvStore, fatal: bool) -> Result<()> {
    if fatal {
        kv.set(QUIT_ON_PLUGIN_STARTUP_FAILURE_KEY, "true").await?;
    } else {
        kv.del(QUIT_ON_PLUGIN_STARTUP_FAILURE_KEY).await?;
    }
    info!(fatal, "Updated plugin startup fatality flag");
    Ok(())
}
