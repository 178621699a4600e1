//! Generic namespaced key-value area.
//!
//! Small pieces of state that are neither secrets nor domain records (such
//! as the plugin startup fatality flag) live here, keyed by
//! `(org_id, namespace, key)`.

pub mod namespaced;
pub mod sql;

pub use namespaced::NamespacedKvStore;
pub use sql::SqlKvStore;

use crate::errors::Result;
use async_trait::async_trait;

/// Organization id for entries that are not scoped to a single organization.
pub const ALL_ORGANIZATIONS: i64 = -1;

/// Address of one key-value entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KvKey {
    pub org_id: i64,
    pub namespace: String,
    pub key: String,
}

/// Storage interface for the key-value area.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch a value, `None` when the key is absent.
    async fn get(&self, org_id: i64, namespace: &str, key: &str) -> Result<Option<String>>;

    /// Insert or replace a value.
    async fn set(&self, org_id: i64, namespace: &str, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Removing an absent key succeeds.
    async fn del(&self, org_id: i64, namespace: &str, key: &str) -> Result<()>;

    /// List keys in a namespace starting with `key_prefix` (empty prefix lists all).
    async fn keys(&self, org_id: i64, namespace: &str, key_prefix: &str) -> Result<Vec<KvKey>>;
}
