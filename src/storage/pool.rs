//! # Database Connection Pool Management
//!
//! Provides database connection pool creation for the local secret store.

use crate::config::DatabaseConfig;
use crate::errors::{Error, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Pool, Sqlite,
};
use std::{str::FromStr, time::Duration};

/// Type alias for the database connection pool
pub type DbPool = Pool<Sqlite>;

const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Create a database connection pool with the specified configuration
pub async fn create_pool(config: &DatabaseConfig) -> Result<DbPool> {
    config.validate()?;

    let pool_options = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout())
        .test_before_acquire(true);

    let pool_options = if let Some(idle_timeout) = config.idle_timeout() {
        pool_options.idle_timeout(idle_timeout)
    } else {
        pool_options
    };

    let connect_options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|e| {
            Error::database(
                e,
                format!("Invalid SQLite connection string: {}", sanitize_url(&config.url)),
            )
        })?
        .create_if_missing(true)
        .busy_timeout(SQLITE_BUSY_TIMEOUT)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = pool_options.connect_with(connect_options).await.map_err(|e| {
        tracing::error!(
            error = %e,
            url = %sanitize_url(&config.url),
            busy_timeout_ms = SQLITE_BUSY_TIMEOUT.as_millis(),
            "Failed to create SQLite database pool"
        );
        Error::database(e, format!("Failed to connect to database: {}", sanitize_url(&config.url)))
    })?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        connect_timeout_ms = config.connect_timeout().as_millis(),
        idle_timeout_ms = config.idle_timeout().map(|d| d.as_millis()),
        "Database connection pool created"
    );

    if config.auto_migrate {
        tracing::info!("Auto-migration enabled, running database migrations");
        crate::storage::migrations::run_migrations(&pool).await?;
    }

    Ok(pool)
}

/// Sanitize database URL for logging (remove credentials)
fn sanitize_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) if parsed.password().is_some() || !parsed.username().is_empty() => format!(
            "{}://***:***@{}{}",
            parsed.scheme(),
            parsed.host_str().unwrap_or("unknown"),
            parsed.path()
        ),
        _ => url.to_string(),
    }
}
