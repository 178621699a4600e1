//! Secret migration between the local store and the remote plugin.
//!
//! [`SecretMigrator`] moves every secret record to whichever backend is about
//! to become authoritative:
//!
//! - **to plugin**: all records are copied into the configured store first,
//!   and only once every copy succeeded are they deleted from the local
//!   store. A failed delete leaves the run partially committed; rerunning it
//!   picks up whatever is still local.
//! - **from plugin**: every key the plugin lists is copied into a fresh local
//!   store, best-effort per key. Nothing is deleted from the plugin.
//!
//! A migrator is built once per invocation and must not run concurrently
//! with another migration against the same backends.

use super::check::RemoteSecretsPluginCheck;
use super::fatal::{is_plugin_startup_error_fatal, plugin_kv_store, set_plugin_startup_error_fatal};
use super::plugin::ListSecretsRequest;
use super::store::{LocalStoreFactory, SecretsKvStore};
use crate::config::MigrationSettings;
use crate::errors::{Error, Result};
use crate::kvstore::{KvStore, NamespacedKvStore};
use crate::secret_span;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn, Instrument};

/// Which way a migration run moves secrets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MigrationDirection {
    #[default]
    None,
    ToPlugin,
    FromPlugin,
}

impl MigrationDirection {
    /// Pick the direction from configuration and the live availability
    /// result. The two directions are mutually exclusive, and each only runs
    /// toward the backend that is about to be authoritative.
    pub fn resolve(settings: MigrationSettings, use_remote_plugin: bool) -> Self {
        if settings.migrate_to_plugin && use_remote_plugin {
            Self::ToPlugin
        } else if settings.migrate_from_plugin && !use_remote_plugin {
            Self::FromPlugin
        } else {
            Self::None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ToPlugin => "to_plugin",
            Self::FromPlugin => "from_plugin",
        }
    }
}

impl fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one successful migration run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub direction: MigrationDirection,
    /// Records written to the destination.
    pub migrated: usize,
    /// Records removed from the source (to plugin only).
    pub deleted: usize,
    /// Keys whose value could not be fetched or did not exist (from plugin only).
    pub skipped: usize,
    /// Keys fetched but not written locally (from plugin only).
    pub failed: usize,
}

impl MigrationReport {
    fn new(direction: MigrationDirection) -> Self {
        Self { direction, ..Default::default() }
    }
}

/// Drives a single secrets migration.
pub struct SecretMigrator {
    secrets_store: Arc<dyn SecretsKvStore>,
    settings: MigrationSettings,
    local_stores: Arc<dyn LocalStoreFactory>,
    remote_check: Arc<dyn RemoteSecretsPluginCheck>,
    fatal_flag: NamespacedKvStore,
}

impl SecretMigrator {
    /// `secrets_store` is the store the application is configured to use;
    /// `kv_store` backs the plugin startup fatality flag.
    pub fn new(
        secrets_store: Arc<dyn SecretsKvStore>,
        settings: MigrationSettings,
        local_stores: Arc<dyn LocalStoreFactory>,
        remote_check: Arc<dyn RemoteSecretsPluginCheck>,
        kv_store: Arc<dyn KvStore>,
    ) -> Self {
        Self {
            secrets_store,
            settings,
            local_stores,
            remote_check,
            fatal_flag: plugin_kv_store(kv_store),
        }
    }

    /// Direction this run would take. The availability check is only
    /// consulted when a migration is configured at all.
    pub fn direction(&self) -> MigrationDirection {
        if !self.settings.migrate_to_plugin && !self.settings.migrate_from_plugin {
            return MigrationDirection::None;
        }
        MigrationDirection::resolve(
            self.settings,
            self.remote_check.should_use_remote_secrets_plugin(),
        )
    }

    #[instrument(skip(self), name = "secrets_migration", fields(direction = tracing::field::Empty))]
    pub async fn migrate(&self) -> Result<MigrationReport> {
        let direction = self.direction();
        tracing::Span::current().record("direction", direction.as_str());

        match direction {
            MigrationDirection::ToPlugin => self.migrate_to_plugin().await,
            MigrationDirection::FromPlugin => self.migrate_from_plugin().await,
            MigrationDirection::None => {
                debug!("No secrets migration requested");
                Ok(MigrationReport::new(direction))
            }
        }
    }

    async fn migrate_to_plugin(&self) -> Result<MigrationReport> {
        let mut report = MigrationReport::new(MigrationDirection::ToPlugin);
        info!("Starting migration of local secrets to the secrets manager plugin");

        let local = self.local_stores.create_local_store();

        let was_fatal = match is_plugin_startup_error_fatal(&self.fatal_flag).await {
            Ok(fatal) => fatal,
            Err(e) => {
                warn!(
                    error = %e,
                    "Unable to determine whether plugin startup failures are fatal, continuing migration"
                );
                false
            }
        };

        let items = match local.get_all().await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "Unable to read local secrets, nothing to migrate");
                return Ok(report);
            }
        };

        for item in &items {
            let key = &item.key;
            let span = secret_span!("copy_to_plugin", key.org_id, &key.namespace, &key.secret_type);
            if let Err(e) = self
                .secrets_store
                .set(key.org_id, &key.namespace, &key.secret_type, &item.value)
                .instrument(span)
                .await
            {
                error!(
                    org_id = key.org_id,
                    namespace = %key.namespace,
                    secret_type = %key.secret_type,
                    error = %e,
                    "Failed to write secret to plugin, aborting migration"
                );
                return Err(e);
            }
            report.migrated += 1;
        }
        debug!(count = report.migrated, "Copied local secrets to plugin");

        for (index, item) in items.iter().enumerate() {
            let key = &item.key;
            let span = secret_span!(
                "delete_local",
                key.org_id,
                &key.namespace,
                &key.secret_type,
                index = index
            );
            if let Err(e) = local
                .del(key.org_id, &key.namespace, &key.secret_type)
                .instrument(span)
                .await
            {
                error!(
                    org_id = key.org_id,
                    namespace = %key.namespace,
                    secret_type = %key.secret_type,
                    index,
                    error = %e,
                    "Failed to delete migrated secret from local store"
                );
                // Nothing was removed yet, so the local store still works on its own.
                if index == 0 && !was_fatal {
                    match set_plugin_startup_error_fatal(&self.fatal_flag, false).await {
                        Ok(()) => debug!("Plugin startup failures remain non-fatal"),
                        Err(flag_err) => error!(
                            error = %flag_err,
                            "Failed to reset plugin startup fatality flag"
                        ),
                    }
                }
                return Err(e);
            }
            report.deleted += 1;
        }

        info!(
            migrated = report.migrated,
            deleted = report.deleted,
            "Completed migration of secrets to plugin"
        );
        Ok(report)
    }

    async fn migrate_from_plugin(&self) -> Result<MigrationReport> {
        let mut report = MigrationReport::new(MigrationDirection::FromPlugin);
        info!("Starting migration of secrets from the secrets manager plugin");

        let plugin = match self.remote_check.start_and_return_plugin().await {
            Ok(plugin) => plugin,
            Err(e) => {
                error!(error = %e, "Failed to start secrets manager plugin");
                return Err(e);
            }
        };

        let listed = match plugin.list_secrets(ListSecretsRequest::all()).await {
            Ok(response) if response.user_friendly_error.is_empty() => response.keys,
            Ok(response) => {
                error!(error = %response.user_friendly_error, "Failed to list secrets from plugin");
                return Err(Error::plugin(format!(
                    "list_secrets failed: {}",
                    response.user_friendly_error
                )));
            }
            Err(e) => {
                error!(error = %e, "Failed to list secrets from plugin");
                return Err(e);
            }
        };
        debug!(count = listed.len(), "Retrieved secret keys from plugin");

        let local = self.local_stores.create_local_store();

        for key in &listed {
            let span = secret_span!("copy_from_plugin", key.org_id, &key.namespace, &key.secret_type);
            let value = match self
                .secrets_store
                .get(key.org_id, &key.namespace, &key.secret_type)
                .instrument(span.clone())
                .await
            {
                Ok(Some(value)) => value,
                Ok(None) => {
                    warn!(
                        org_id = key.org_id,
                        namespace = %key.namespace,
                        secret_type = %key.secret_type,
                        "Secret not found on plugin"
                    );
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    error!(
                        org_id = key.org_id,
                        namespace = %key.namespace,
                        secret_type = %key.secret_type,
                        error = %e,
                        "Failed to retrieve secret from plugin"
                    );
                    report.skipped += 1;
                    continue;
                }
            };

            match local
                .set(key.org_id, &key.namespace, &key.secret_type, &value)
                .instrument(span)
                .await
            {
                Ok(()) => report.migrated += 1,
                Err(e) => {
                    error!(
                        org_id = key.org_id,
                        namespace = %key.namespace,
                        secret_type = %key.secret_type,
                        error = %e,
                        "Failed to write secret to local store"
                    );
                    report.failed += 1;
                }
            }
        }

        info!(
            migrated = report.migrated,
            skipped = report.skipped,
            failed = report.failed,
            "Completed migration of secrets from plugin"
        );
        Ok(report)
    }
}

impl fmt::Debug for SecretMigrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretMigrator")
            .field("settings", &self.settings)
            .field("fatal_flag", &self.fatal_flag)
            .finish()
    }
}
