//! # Structured Logging
//!
//! Subscriber setup and span macros built on the tracing ecosystem.
//! Secret values must never be recorded as span or event fields; only the
//! `(org_id, namespace, secret_type)` key is.

use crate::config::LogConfig;
use crate::errors::{Error, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Create a tracing span for an operation on one secret record.
///
/// ```rust,ignore
/// let span = secret_span!("copy_to_plugin", key.org_id, &key.namespace, &key.secret_type);
/// ```
#[macro_export]
macro_rules! secret_span {
    ($operation:expr, $org_id:expr, $namespace:expr, $secret_type:expr) => {
        tracing::debug_span!(
            "secret_operation",
            operation = %$operation,
            org_id = $org_id,
            namespace = %$namespace,
            secret_type = %$secret_type
        )
    };
    ($operation:expr, $org_id:expr, $namespace:expr, $secret_type:expr, $($field:tt)*) => {
        tracing::debug_span!(
            "secret_operation",
            operation = %$operation,
            org_id = $org_id,
            namespace = %$namespace,
            secret_type = %$secret_type,
            $($field)*
        )
    };
}

/// Build the filter: `RUST_LOG` wins, otherwise the configured level.
fn build_filter(config: &LogConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| {
            Error::config_with_source(format!("Invalid log level '{}'", config.level), Box::new(e))
        }),
    }
}

/// Install the global tracing subscriber.
///
/// Returns `Ok(())` when a subscriber is already installed (e.g. by the
/// embedding application or a test harness).
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = build_filter(config)?;

    let installed = if config.json {
        tracing::subscriber::set_global_default(
            fmt::Subscriber::builder().with_env_filter(filter).json().finish(),
        )
    } else {
        tracing::subscriber::set_global_default(
            fmt::Subscriber::builder().with_env_filter(filter).finish(),
        )
    };

    if installed.is_err() {
        tracing::debug!("Global subscriber already set, keeping it");
    }

    Ok(())
}
