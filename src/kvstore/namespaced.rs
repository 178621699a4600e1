//! Key-value handle bound to one organization and namespace.

use super::{KvKey, KvStore};
use crate::errors::Result;
use std::sync::Arc;

/// A [`KvStore`] view fixed to an `(org_id, namespace)` pair.
#[derive(Clone)]
pub struct NamespacedKvStore {
    kv: Arc<dyn KvStore>,
    org_id: i64,
    namespace: String,
}

impl NamespacedKvStore {
    pub fn new(kv: Arc<dyn KvStore>, org_id: i64, namespace: impl Into<String>) -> Self {
        Self { kv, org_id, namespace: namespace.into() }
    }

    pub fn org_id(&self) -> i64 {
        self.org_id
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        self.kv.get(self.org_id, &self.namespace, key).await
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.kv.set(self.org_id, &self.namespace, key, value).await
    }

    pub async fn del(&self, key: &str) -> Result<()> {
        self.kv.del(self.org_id, &self.namespace, key).await
    }

    pub async fn keys(&self, key_prefix: &str) -> Result<Vec<KvKey>> {
        self.kv.keys(self.org_id, &self.namespace, key_prefix).await
    }
}

impl std::fmt::Debug for NamespacedKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespacedKvStore")
            .field("org_id", &self.org_id)
            .field("namespace", &self.namespace)
            .finish()
    }
}
