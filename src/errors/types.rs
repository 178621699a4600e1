//! # Error Types
//!
//! Error types for secret storage and migration using `thiserror`.

/// Custom result type for secretshift operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for secretshift
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Database and storage errors
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// Errors reported by the remote secrets plugin or its transport
    #[error("Secrets plugin error: {message}")]
    Plugin { message: String },

    /// Encryption or decryption of a secret value failed
    #[error("Encryption error: {message}")]
    Encryption { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create a database error with context
    pub fn database<S: Into<String>>(source: sqlx::Error, context: S) -> Self {
        Self::Database { source, context: context.into() }
    }

    /// Create a plugin error
    pub fn plugin<S: Into<String>>(message: S) -> Self {
        Self::Plugin { message: message.into() }
    }

    /// Create an encryption error
    pub fn encryption<S: Into<String>>(message: S) -> Self {
        Self::Encryption { message: message.into() }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into() }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::config_with_source("Failed to load settings", Box::new(err))
    }
}
