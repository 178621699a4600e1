//! Secret record types shared by both store backends.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A secret value that never shows up in `Debug` or `Display` output.
///
/// The buffer is zeroed on drop. Read it with [`SecretString::expose_secret`]
/// only at the point where the plaintext is handed to a backend.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Borrow the plaintext. Never log the result.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for SecretString {}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identity of a secret record: unique per backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SecretKey {
    pub org_id: i64,
    pub namespace: String,
    pub secret_type: String,
}

impl SecretKey {
    pub fn new(org_id: i64, namespace: impl Into<String>, secret_type: impl Into<String>) -> Self {
        Self { org_id, namespace: namespace.into(), secret_type: secret_type.into() }
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.org_id, self.namespace, self.secret_type)
    }
}

/// A full secret record with its plaintext value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub key: SecretKey,
    pub value: SecretString,
    pub created: chrono::DateTime<chrono::Utc>,
    pub updated: chrono::DateTime<chrono::Utc>,
}

impl Item {
    /// Build an item stamped with the current time.
    pub fn new(key: SecretKey, value: impl Into<SecretString>) -> Self {
        let now = chrono::Utc::now();
        Self { key, value: value.into(), created: now, updated: now }
    }
}
