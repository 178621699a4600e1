//! # Error Handling
//!
//! Error handling for secretshift. Every fallible operation in the crate
//! returns [`Result`], so storage, plugin and configuration failures share
//! one error type.

pub mod types;

pub use types::{Error, Result};
