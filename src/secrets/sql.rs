//! SQL-backed local secret store.
//!
//! Values are encrypted through the injected [`SecretsService`] and stored
//! base64-encoded in the `secrets` table. Decrypted plaintext is cached per
//! organization and reused only while the row's `updated` timestamp is
//! unchanged.

use super::service::SecretsService;
use super::store::{LocalSecretsStore, LocalStoreFactory, SecretsKvStore};
use super::types::{Item, SecretKey, SecretString};
use crate::errors::{Error, Result};
use crate::kvstore::ALL_ORGANIZATIONS;
use crate::storage::DbPool;
use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, instrument};

/// Database row structure for secrets
#[derive(Debug, Clone, FromRow)]
struct SecretRow {
    org_id: i64,
    namespace: String,
    secret_type: String,
    value: String,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

impl SecretRow {
    fn key(&self) -> SecretKey {
        SecretKey::new(self.org_id, &self.namespace, &self.secret_type)
    }
}

#[derive(Debug, Clone)]
struct CachedDecrypted {
    updated: DateTime<Utc>,
    value: SecretString,
}

/// Decrypted values grouped by organization, then `(namespace, type)`.
#[derive(Debug, Default)]
struct DecryptionCache {
    by_org: HashMap<i64, HashMap<(String, String), CachedDecrypted>>,
}

impl DecryptionCache {
    fn lookup(&self, key: &SecretKey, updated: DateTime<Utc>) -> Option<SecretString> {
        self.by_org
            .get(&key.org_id)?
            .get(&(key.namespace.clone(), key.secret_type.clone()))
            .filter(|entry| entry.updated == updated)
            .map(|entry| entry.value.clone())
    }

    fn insert(&mut self, key: &SecretKey, updated: DateTime<Utc>, value: SecretString) {
        self.by_org
            .entry(key.org_id)
            .or_default()
            .insert((key.namespace.clone(), key.secret_type.clone()), CachedDecrypted { updated, value });
    }

    fn evict(&mut self, org_id: i64, namespace: &str, secret_type: &str) {
        if let Some(org) = self.by_org.get_mut(&org_id) {
            org.remove(&(namespace.to_string(), secret_type.to_string()));
        }
    }

    fn evict_namespace(&mut self, org_id: i64, namespace: &str) {
        if let Some(org) = self.by_org.get_mut(&org_id) {
            org.retain(|(ns, _), _| ns != namespace);
        }
    }
}

/// Secret store persisted in the application database.
pub struct SqlSecretsKvStore {
    pool: DbPool,
    secrets_service: Arc<dyn SecretsService>,
    cache: RwLock<DecryptionCache>,
}

impl SqlSecretsKvStore {
    /// Create a store with an empty decryption cache.
    pub fn new(pool: DbPool, secrets_service: Arc<dyn SecretsService>) -> Self {
        Self { pool, secrets_service, cache: RwLock::new(DecryptionCache::default()) }
    }

    async fn encrypt(&self, value: &SecretString) -> Result<String> {
        let encrypted = self.secrets_service.encrypt(value.expose_secret().as_bytes()).await?;
        Ok(base64::engine::general_purpose::STANDARD.encode(encrypted))
    }

    /// Return the plaintext for a row, from cache when the row is unchanged.
    async fn decrypt_row(&self, row: &SecretRow) -> Result<SecretString> {
        let key = row.key();
        if let Some(value) = self.cache.read().await.lookup(&key, row.updated) {
            debug!(org_id = key.org_id, namespace = %key.namespace, secret_type = %key.secret_type, "Decryption cache hit");
            return Ok(value);
        }

        let encrypted = base64::engine::general_purpose::STANDARD.decode(&row.value).map_err(|e| {
            Error::encryption(format!("Stored value for '{}' is not valid base64: {}", key, e))
        })?;
        let decrypted = self.secrets_service.decrypt(&encrypted).await?;
        let value = String::from_utf8(decrypted).map(SecretString::new).map_err(|e| {
            Error::encryption(format!("Decrypted value for '{}' is not valid UTF-8: {}", key, e))
        })?;

        self.cache.write().await.insert(&key, row.updated, value.clone());
        Ok(value)
    }

    async fn fetch_row(
        &self,
        org_id: i64,
        namespace: &str,
        secret_type: &str,
    ) -> Result<Option<SecretRow>> {
        sqlx::query_as::<_, SecretRow>(
            "SELECT org_id, namespace, type AS secret_type, value, created, updated FROM secrets \
             WHERE org_id = ? AND namespace = ? AND type = ?",
        )
        .bind(org_id)
        .bind(namespace)
        .bind(secret_type)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(error = %e, org_id, namespace, secret_type, "Failed to read secret");
            Error::database(e, "Failed to read secret")
        })
    }
}

#[async_trait]
impl SecretsKvStore for SqlSecretsKvStore {
    #[instrument(skip(self), name = "db_get_secret")]
    async fn get(
        &self,
        org_id: i64,
        namespace: &str,
        secret_type: &str,
    ) -> Result<Option<SecretString>> {
        match self.fetch_row(org_id, namespace, secret_type).await? {
            Some(row) => self.decrypt_row(&row).await.map(Some),
            None => {
                debug!("Secret not found in database");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, value), name = "db_set_secret")]
    async fn set(
        &self,
        org_id: i64,
        namespace: &str,
        secret_type: &str,
        value: &SecretString,
    ) -> Result<()> {
        let encoded = self.encrypt(value).await?;
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO secrets (org_id, namespace, type, value, created, updated) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT (org_id, namespace, type) DO UPDATE SET value = excluded.value, updated = excluded.updated",
        )
        .bind(org_id)
        .bind(namespace)
        .bind(secret_type)
        .bind(&encoded)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(error = %e, org_id, namespace, secret_type, "Failed to write secret");
            Error::database(e, "Failed to write secret")
        })?;

        self.cache.write().await.evict(org_id, namespace, secret_type);
        debug!("Secret written to database");
        Ok(())
    }

    #[instrument(skip(self), name = "db_del_secret")]
    async fn del(&self, org_id: i64, namespace: &str, secret_type: &str) -> Result<()> {
        sqlx::query("DELETE FROM secrets WHERE org_id = ? AND namespace = ? AND type = ?")
            .bind(org_id)
            .bind(namespace)
            .bind(secret_type)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, org_id, namespace, secret_type, "Failed to delete secret");
                Error::database(e, "Failed to delete secret")
            })?;

        self.cache.write().await.evict(org_id, namespace, secret_type);
        Ok(())
    }

    #[instrument(skip(self), name = "db_secret_keys")]
    async fn keys(
        &self,
        org_id: i64,
        namespace: Option<&str>,
        secret_type: Option<&str>,
    ) -> Result<Vec<SecretKey>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT org_id, namespace, type AS secret_type, value, created, updated FROM secrets WHERE 1 = 1",
        );
        if org_id != ALL_ORGANIZATIONS {
            query.push(" AND org_id = ").push_bind(org_id);
        }
        if let Some(namespace) = namespace {
            query.push(" AND namespace = ").push_bind(namespace);
        }
        if let Some(secret_type) = secret_type {
            query.push(" AND type = ").push_bind(secret_type);
        }
        query.push(" ORDER BY org_id, namespace, type");

        let rows = query
            .build_query_as::<SecretRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::database(e, "Failed to list secret keys"))?;

        Ok(rows.iter().map(SecretRow::key).collect())
    }

    #[instrument(skip(self), name = "db_rename_secrets")]
    async fn rename(&self, org_id: i64, namespace: &str, new_namespace: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE secrets SET namespace = ?, updated = ? WHERE org_id = ? AND namespace = ?",
        )
        .bind(new_namespace)
        .bind(Utc::now())
        .bind(org_id)
        .bind(namespace)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(error = %e, org_id, namespace, new_namespace, "Failed to rename secrets");
            Error::database(e, "Failed to rename secrets")
        })?;

        self.cache.write().await.evict_namespace(org_id, namespace);
        debug!(renamed = result.rows_affected(), "Renamed secret namespace");
        Ok(())
    }
}

#[async_trait]
impl LocalSecretsStore for SqlSecretsKvStore {
    #[instrument(skip(self), name = "db_get_all_secrets")]
    async fn get_all(&self) -> Result<Vec<Item>> {
        let rows = sqlx::query_as::<_, SecretRow>(
            "SELECT org_id, namespace, type AS secret_type, value, created, updated FROM secrets \
             ORDER BY org_id, namespace, type",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::database(e, "Failed to read all secrets"))?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            let value = self.decrypt_row(row).await?;
            items.push(Item { key: row.key(), value, created: row.created, updated: row.updated });
        }

        debug!(count = items.len(), "Read all secrets from database");
        Ok(items)
    }
}

/// Builds a fresh [`SqlSecretsKvStore`] against the live database on every call.
#[derive(Clone)]
pub struct SqlLocalStoreFactory {
    pool: DbPool,
    secrets_service: Arc<dyn SecretsService>,
}

impl SqlLocalStoreFactory {
    pub fn new(pool: DbPool, secrets_service: Arc<dyn SecretsService>) -> Self {
        Self { pool, secrets_service }
    }
}

impl LocalStoreFactory for SqlLocalStoreFactory {
    fn create_local_store(&self) -> Box<dyn LocalSecretsStore> {
        Box::new(SqlSecretsKvStore::new(self.pool.clone(), self.secrets_service.clone()))
    }
}
