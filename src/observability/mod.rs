//! # Observability Infrastructure
//!
//! Structured logging for secret storage and migration.

pub mod logging;

pub use logging::init_logging;
