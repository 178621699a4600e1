//! # Storage and Persistence
//!
//! Database connectivity and schema management for the local secret store
//! and the generic key-value area.

pub mod migrations;
pub mod pool;


pub use crate::config::DatabaseConfig;

pub use pool::{create_pool, DbPool};

use crate::errors::Result;

/// Run database migrations
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    migrations::run_migrations(pool).await
}
