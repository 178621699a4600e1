//! SQL-backed key-value store on the `kv_store` table.

use super::{KvKey, KvStore};
use crate::errors::{Error, Result};
use crate::storage::DbPool;
use async_trait::async_trait;
use sqlx::FromRow;
use tracing::instrument;

#[derive(Debug, Clone, FromRow)]
struct KvKeyRow {
    org_id: i64,
    namespace: String,
    key: String,
}

impl From<KvKeyRow> for KvKey {
    fn from(row: KvKeyRow) -> Self {
        Self { org_id: row.org_id, namespace: row.namespace, key: row.key }
    }
}

/// Key-value store persisted in the application database
#[derive(Debug, Clone)]
pub struct SqlKvStore {
    pool: DbPool,
}

impl SqlKvStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KvStore for SqlKvStore {
    #[instrument(skip(self), name = "kv_get")]
    async fn get(&self, org_id: i64, namespace: &str, key: &str) -> Result<Option<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT value FROM kv_store WHERE org_id = ? AND namespace = ? AND key = ?",
        )
        .bind(org_id)
        .bind(namespace)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::database(e, format!("Failed to read kv entry '{}/{}'", namespace, key)))
    }

    #[instrument(skip(self, value), name = "kv_set")]
    async fn set(&self, org_id: i64, namespace: &str, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now();

        sqlx::query(
            "INSERT INTO kv_store (org_id, namespace, key, value, created, updated) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT (org_id, namespace, key) DO UPDATE SET value = excluded.value, updated = excluded.updated",
        )
        .bind(org_id)
        .bind(namespace)
        .bind(key)
        .bind(value)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, org_id, namespace, key, "Failed to write kv entry");
            Error::database(e, format!("Failed to write kv entry '{}/{}'", namespace, key))
        })?;

        Ok(())
    }

    #[instrument(skip(self), name = "kv_del")]
    async fn del(&self, org_id: i64, namespace: &str, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_store WHERE org_id = ? AND namespace = ? AND key = ?")
            .bind(org_id)
            .bind(namespace)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::database(e, format!("Failed to delete kv entry '{}/{}'", namespace, key))
            })?;

        Ok(())
    }

    #[instrument(skip(self), name = "kv_keys")]
    async fn keys(&self, org_id: i64, namespace: &str, key_prefix: &str) -> Result<Vec<KvKey>> {
        let rows = sqlx::query_as::<_, KvKeyRow>(
            "SELECT org_id, namespace, key FROM kv_store \
             WHERE org_id = ? AND namespace = ? AND substr(key, 1, length(?)) = ? \
             ORDER BY key",
        )
        .bind(org_id)
        .bind(namespace)
        .bind(key_prefix)
        .bind(key_prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::database(e, format!("Failed to list kv keys in '{}'", namespace)))?;

        Ok(rows.into_iter().map(KvKey::from).collect())
    }
}
