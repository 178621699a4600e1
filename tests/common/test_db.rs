//! Test database utilities for integration tests.
//!
//! Each database is a SQLite file in its own temporary directory, created
//! through the same pool setup the library uses.

#![allow(clippy::duplicate_mod)]

use secretshift::config::DatabaseConfig;
use secretshift::storage::{self, DbPool};
use tempfile::TempDir;

/// A test database that is deleted on drop.
pub struct TestDatabase {
    pub pool: DbPool,
    _dir: TempDir,
}

impl TestDatabase {
    /// Create a new test database with migrations applied.
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("create test database directory");
        let config = DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("secretshift.db").display()),
            max_connections: 5,
            auto_migrate: true,
            ..Default::default()
        };

        let pool = storage::create_pool(&config).await.expect("create test database pool");
        Self { pool, _dir: dir }
    }
}
