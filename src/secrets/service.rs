//! Encryption seam for the local secret store.
//!
//! The cipher lives outside this crate; the local store only calls through
//! this trait when it writes or reads a value.

use crate::errors::Result;
use async_trait::async_trait;

/// Encrypts and decrypts secret payloads for at-rest storage.
#[async_trait]
pub trait SecretsService: Send + Sync {
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>>;
}
