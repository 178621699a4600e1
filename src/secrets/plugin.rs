//! Remote secrets plugin client surface.
//!
//! [`SecretsManagerPlugin`] is the request/response contract of the
//! out-of-process secrets manager plugin; the transport behind it is provided
//! by the embedding application. [`PluginSecretsKvStore`] adapts any client
//! to the common [`SecretsKvStore`] contract.

use super::store::SecretsKvStore;
use super::types::{SecretKey, SecretString};
use crate::errors::{Error, Result};
use crate::kvstore::ALL_ORGANIZATIONS;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetSecretRequest {
    pub key: SecretKey,
}

#[derive(Debug, Clone, Default)]
pub struct GetSecretResponse {
    pub value: Option<SecretString>,
    pub user_friendly_error: String,
}

#[derive(Debug, Clone)]
pub struct SetSecretRequest {
    pub key: SecretKey,
    pub value: SecretString,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteSecretRequest {
    pub key: SecretKey,
}

/// Key listing filter. `all_keys` ignores every other field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSecretsRequest {
    pub org_id: i64,
    pub namespace: Option<String>,
    pub secret_type: Option<String>,
    pub all_keys: bool,
}

impl ListSecretsRequest {
    /// Request every key the plugin holds.
    pub fn all() -> Self {
        Self { org_id: ALL_ORGANIZATIONS, namespace: None, secret_type: None, all_keys: true }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListSecretsResponse {
    pub keys: Vec<SecretKey>,
    pub user_friendly_error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameSecretRequest {
    pub org_id: i64,
    pub namespace: String,
    pub new_namespace: String,
}

/// Response for calls that return nothing but a possible error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginResponse {
    pub user_friendly_error: String,
}

/// Client for the remote secrets manager plugin.
///
/// `Err` means the call did not reach the plugin; a non-empty
/// `user_friendly_error` means the plugin rejected it.
#[async_trait]
pub trait SecretsManagerPlugin: Send + Sync {
    async fn get_secret(&self, request: GetSecretRequest) -> Result<GetSecretResponse>;

    async fn set_secret(&self, request: SetSecretRequest) -> Result<PluginResponse>;

    async fn delete_secret(&self, request: DeleteSecretRequest) -> Result<PluginResponse>;

    async fn list_secrets(&self, request: ListSecretsRequest) -> Result<ListSecretsResponse>;

    async fn rename_secret(&self, request: RenameSecretRequest) -> Result<PluginResponse>;
}

fn check_plugin_error(operation: &str, user_friendly_error: &str) -> Result<()> {
    if user_friendly_error.is_empty() {
        Ok(())
    } else {
        warn!(operation, error = %user_friendly_error, "Secrets plugin returned an error");
        Err(Error::plugin(format!("{} failed: {}", operation, user_friendly_error)))
    }
}

/// [`SecretsKvStore`] backed by the remote plugin.
#[derive(Clone)]
pub struct PluginSecretsKvStore {
    plugin: Arc<dyn SecretsManagerPlugin>,
}

impl PluginSecretsKvStore {
    pub fn new(plugin: Arc<dyn SecretsManagerPlugin>) -> Self {
        Self { plugin }
    }
}

#[async_trait]
impl SecretsKvStore for PluginSecretsKvStore {
    #[instrument(skip(self), name = "plugin_get_secret")]
    async fn get(
        &self,
        org_id: i64,
        namespace: &str,
        secret_type: &str,
    ) -> Result<Option<SecretString>> {
        let response = self
            .plugin
            .get_secret(GetSecretRequest { key: SecretKey::new(org_id, namespace, secret_type) })
            .await?;
        check_plugin_error("get_secret", &response.user_friendly_error)?;
        Ok(response.value)
    }

    #[instrument(skip(self, value), name = "plugin_set_secret")]
    async fn set(
        &self,
        org_id: i64,
        namespace: &str,
        secret_type: &str,
        value: &SecretString,
    ) -> Result<()> {
        let response = self
            .plugin
            .set_secret(SetSecretRequest {
                key: SecretKey::new(org_id, namespace, secret_type),
                value: value.clone(),
            })
            .await?;
        check_plugin_error("set_secret", &response.user_friendly_error)
    }

    #[instrument(skip(self), name = "plugin_del_secret")]
    async fn del(&self, org_id: i64, namespace: &str, secret_type: &str) -> Result<()> {
        let response = self
            .plugin
            .delete_secret(DeleteSecretRequest { key: SecretKey::new(org_id, namespace, secret_type) })
            .await?;
        check_plugin_error("delete_secret", &response.user_friendly_error)
    }

    #[instrument(skip(self), name = "plugin_secret_keys")]
    async fn keys(
        &self,
        org_id: i64,
        namespace: Option<&str>,
        secret_type: Option<&str>,
    ) -> Result<Vec<SecretKey>> {
        let all_keys = org_id == ALL_ORGANIZATIONS && namespace.is_none() && secret_type.is_none();
        let response = self
            .plugin
            .list_secrets(ListSecretsRequest {
                org_id,
                namespace: namespace.map(str::to_string),
                secret_type: secret_type.map(str::to_string),
                all_keys,
            })
            .await?;
        check_plugin_error("list_secrets", &response.user_friendly_error)?;
        debug!(count = response.keys.len(), "Listed secret keys from plugin");
        Ok(response.keys)
    }

    #[instrument(skip(self), name = "plugin_rename_secrets")]
    async fn rename(&self, org_id: i64, namespace: &str, new_namespace: &str) -> Result<()> {
        let response = self
            .plugin
            .rename_secret(RenameSecretRequest {
                org_id,
                namespace: namespace.to_string(),
                new_namespace: new_namespace.to_string(),
            })
            .await?;
        check_plugin_error("rename_secret", &response.user_friendly_error)
    }
}
