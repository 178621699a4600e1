//! Secret store capability shared by the local and remote backends.

use super::types::{Item, SecretKey, SecretString};
use crate::errors::Result;
use async_trait::async_trait;

/// Key-value contract for secret records addressed by
/// `(org_id, namespace, secret_type)`.
///
/// Implemented by [`SqlSecretsKvStore`](super::sql::SqlSecretsKvStore) and
/// [`PluginSecretsKvStore`](super::plugin::PluginSecretsKvStore); callers
/// never depend on which one they hold.
///
/// Implementations must not log secret values.
#[async_trait]
pub trait SecretsKvStore: Send + Sync {
    /// Fetch a secret. `Ok(None)` when no record exists for the key.
    async fn get(
        &self,
        org_id: i64,
        namespace: &str,
        secret_type: &str,
    ) -> Result<Option<SecretString>>;

    /// Insert or replace a secret.
    async fn set(
        &self,
        org_id: i64,
        namespace: &str,
        secret_type: &str,
        value: &SecretString,
    ) -> Result<()>;

    /// Delete a secret.
    async fn del(&self, org_id: i64, namespace: &str, secret_type: &str) -> Result<()>;

    /// List keys. `ALL_ORGANIZATIONS` and `None` act as wildcards.
    async fn keys(
        &self,
        org_id: i64,
        namespace: Option<&str>,
        secret_type: Option<&str>,
    ) -> Result<Vec<SecretKey>>;

    /// Move every secret of `(org_id, namespace)` to `new_namespace`.
    async fn rename(&self, org_id: i64, namespace: &str, new_namespace: &str) -> Result<()>;
}

/// The locally persisted store, which can also enumerate full records.
#[async_trait]
pub trait LocalSecretsStore: SecretsKvStore {
    /// Read and decrypt every record in the store.
    async fn get_all(&self) -> Result<Vec<Item>>;
}

/// Builds a fresh local store handle.
///
/// Every call returns an instance with an empty decryption cache, so a
/// migration run always reads what is on disk.
pub trait LocalStoreFactory: Send + Sync {
    fn create_local_store(&self) -> Box<dyn LocalSecretsStore>;
}
