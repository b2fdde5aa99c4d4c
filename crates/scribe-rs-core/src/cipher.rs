//! Pluggable one-way payload encryption.
//!
//! The client only ever produces ciphertext tokens; there is no decrypt path.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use scribe_rs_config::CipherConfig;
use scribe_rs_protocol::{Category, RecordId};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

const NONCE_LEN: usize = 16;

/// Errors raised while producing a ciphertext token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    #[error("nothing to encrypt")]
    EmptyPlaintext,
    #[error("cipher failure: {0}")]
    Failed(String),
}

/// Record metadata bound into the ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionContext {
    pub record_id: RecordId,
    pub owner_id: String,
    pub category: Category,
    pub created_at: i64,
}

/// Plaintext to ciphertext transform.
pub trait PayloadCipher: Send + Sync {
    /// Produce an opaque token for `plaintext`. Must not be reversible by
    /// the client.
    fn encrypt(&self, plaintext: &str, context: &EncryptionContext) -> Result<String, CipherError>;
}

/// Default cipher: a salted SHA-256 digest behind a fixed prefix.
///
/// Tokens look like `FHE-WRITING-<base64url(nonce || digest)>`. A fresh random
/// nonce per call means equal plaintexts never share a token.
#[derive(Debug, Clone)]
pub struct DigestCipher {
    prefix: String,
}

impl DigestCipher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn from_config(config: &CipherConfig) -> Self {
        Self::new(config.token_prefix.clone())
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl PayloadCipher for DigestCipher {
    fn encrypt(&self, plaintext: &str, context: &EncryptionContext) -> Result<String, CipherError> {
        if plaintext.is_empty() {
            return Err(CipherError::EmptyPlaintext);
        }
        let context_bytes =
            serde_json::to_vec(context).map_err(|err| CipherError::Failed(err.to_string()))?;
        let nonce: [u8; NONCE_LEN] = rand::random();

        let mut hasher = Sha256::new();
        hasher.update(nonce);
        hasher.update(&context_bytes);
        hasher.update(plaintext.as_bytes());
        let digest = hasher.finalize();

        let mut sealed = Vec::with_capacity(NONCE_LEN + digest.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&digest);
        Ok(format!("{}{}", self.prefix, URL_SAFE_NO_PAD.encode(sealed)))
    }
}
