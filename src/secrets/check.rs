//! Remote-availability check.
//!
//! Decides whether the remote plugin is the authoritative secret store and
//! starts the plugin on demand.

use super::plugin::SecretsManagerPlugin;
use crate::config::SecretsConfig;
use crate::errors::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

#[async_trait]
pub trait RemoteSecretsPluginCheck: Send + Sync {
    /// Whether the remote plugin should currently be treated as authoritative.
    /// Has no side effects.
    fn should_use_remote_secrets_plugin(&self) -> bool;

    /// Start (or attach to) the plugin process and return its client.
    async fn start_and_return_plugin(&self) -> Result<Arc<dyn SecretsManagerPlugin>>;
}

/// Launches the installed plugin process and connects a client to it.
#[async_trait]
pub trait PluginStarter: Send + Sync {
    async fn start(&self) -> Result<Arc<dyn SecretsManagerPlugin>>;
}

/// Availability check driven by `secrets.use_plugin` and whether a plugin
/// is installed. The plugin is started at most once per check instance.
pub struct ConfiguredPluginCheck {
    use_plugin: bool,
    starter: Option<Arc<dyn PluginStarter>>,
    started: OnceCell<Arc<dyn SecretsManagerPlugin>>,
}

impl ConfiguredPluginCheck {
    /// `starter` is `None` when no plugin is installed.
    pub fn new(use_plugin: bool, starter: Option<Arc<dyn PluginStarter>>) -> Self {
        Self { use_plugin, starter, started: OnceCell::new() }
    }

    pub fn from_config(config: &SecretsConfig, starter: Option<Arc<dyn PluginStarter>>) -> Self {
        Self::new(config.use_plugin, starter)
    }

    pub fn is_plugin_installed(&self) -> bool {
        self.starter.is_some()
    }
}

#[async_trait]
impl RemoteSecretsPluginCheck for ConfiguredPluginCheck {
    fn should_use_remote_secrets_plugin(&self) -> bool {
        let use_remote = self.use_plugin && self.is_plugin_installed();
        debug!(
            use_plugin = self.use_plugin,
            installed = self.is_plugin_installed(),
            use_remote,
            "Evaluated remote secrets plugin availability"
        );
        use_remote
    }

    async fn start_and_return_plugin(&self) -> Result<Arc<dyn SecretsManagerPlugin>> {
        let Some(starter) = self.starter.as_ref() else {
            warn!("Secrets manager plugin requested but none is installed");
            return Err(Error::plugin("no secrets manager plugin is installed"));
        };

        let plugin = self
            .started
            .get_or_try_init(|| async {
                info!("Starting secrets manager plugin");
                starter.start().await
            })
            .await?;
        Ok(Arc::clone(plugin))
    }
}

impl std::fmt::Debug for ConfiguredPluginCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfiguredPluginCheck")
            .field("use_plugin", &self.use_plugin)
            .field("installed", &self.is_plugin_installed())
            .field("started", &self.started.initialized())
            .finish()
    }
}
