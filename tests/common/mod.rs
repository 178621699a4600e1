//! Common test utilities for all integration tests.
//!
//! Provides shared test database setup and recording doubles for the
//! secret stores, the plugin client and the availability check.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

pub mod doubles;
pub mod test_db;
