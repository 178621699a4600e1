//! # Database Migration Management
//!
//! Schema evolution using SQL migrations embedded in the binary at compile
//! time. Each applied migration is recorded in `_secretshift_migrations`.

use crate::errors::{Error, Result};
use crate::storage::DbPool;
use sqlx::Row;
use tracing::{error, info};

/// Embedded migrations as `(filename, sql)`, ordered by version.
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "20260101000001_create_secrets_table",
        include_str!("../../migrations/20260101000001_create_secrets_table.sql"),
    ),
    (
        "20260101000002_create_kv_store_table",
        include_str!("../../migrations/20260101000002_create_kv_store_table.sql"),
    ),
];

/// Run all pending database migrations
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    info!("Starting database migration process");

    create_migration_table(pool).await?;
    let applied = get_applied_migration_versions(pool).await?;

    let mut migrations_run = 0;
    for (filename, sql) in MIGRATIONS {
        let version = extract_version_from_filename(filename)?;

        if applied.contains(&version) {
            info!(version = version, "Migration already applied: {}", filename);
            continue;
        }

        info!(version = version, "Running migration: {}", filename);
        let start_time = std::time::Instant::now();

        let mut tx = pool
            .begin()
            .await
            .map_err(|e| Error::database(e, "Failed to start migration transaction"))?;

        sqlx::raw_sql(sql).execute(&mut *tx).await.map_err(|e| {
            error!(error = %e, migration = filename, "Migration failed");
            Error::database(e, format!("Migration failed: {}", filename))
        })?;

        let execution_time = start_time.elapsed().as_millis() as i64;
        let checksum = calculate_checksum(sql);
        let now = chrono::Utc::now();

        sqlx::query(
            "INSERT INTO _secretshift_migrations (version, description, checksum, execution_time, installed_on) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(version)
        .bind(*filename)
        .bind(&checksum)
        .bind(execution_time)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, migration = filename, "Failed to record migration");
            Error::database(e, format!("Failed to record migration: {}", filename))
        })?;

        tx.commit()
            .await
            .map_err(|e| Error::database(e, "Failed to commit migration transaction"))?;

        migrations_run += 1;
        info!(version = version, execution_time_ms = execution_time, "Migration completed: {}", filename);
    }

    if migrations_run > 0 {
        info!(count = migrations_run, "Database migrations completed");
    } else {
        info!("No pending migrations");
    }

    Ok(())
}

/// Create the migration tracking table
async fn create_migration_table(pool: &DbPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _secretshift_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            checksum BLOB NOT NULL,
            execution_time INTEGER NOT NULL,
            installed_on TEXT NOT NULL
        )
    "#,
    )
    .execute(pool)
    .await
    .map_err(|e| Error::database(e, "Failed to create migration tracking table"))?;

    Ok(())
}

/// Get list of applied migration versions
async fn get_applied_migration_versions(pool: &DbPool) -> Result<Vec<i64>> {
    let rows = sqlx::query("SELECT version FROM _secretshift_migrations ORDER BY version")
        .fetch_all(pool)
        .await;

    match rows {
        Ok(rows) => Ok(rows.into_iter().map(|row| row.get::<i64, _>("version")).collect()),
        Err(sqlx::Error::Database(db_err))
            if db_err.message().contains("no such table: _secretshift_migrations") =>
        {
            Ok(Vec::new())
        }
        Err(e) => Err(Error::database(e, "Failed to get applied migrations")),
    }
}

/// Extract version number from migration filename
fn extract_version_from_filename(filename: &str) -> Result<i64> {
    let version_str = filename
        .split('_')
        .next()
        .ok_or_else(|| Error::validation(format!("Invalid migration filename: {}", filename)))?;

    version_str
        .parse::<i64>()
        .map_err(|_| Error::validation(format!("Invalid version in filename: {}", filename)))
}

/// Calculate checksum for migration content
fn calculate_checksum(content: &str) -> Vec<u8> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish().to_le_bytes().to_vec()
}
