//! Error types for the record protocol.

use crate::cipher::CipherError;
use crate::codec::CodecError;
use scribe_rs_protocol::{RecordId, RecordStatus};
use std::fmt;
use thiserror::Error;

/// Which half of a two-phase append a write failure belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteStage {
    /// The record body itself; nothing reached the ledger.
    Record,
    /// The index append after `record` was persisted.
    Index { record: RecordId },
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteStage::Record => f.write_str("record"),
            WriteStage::Index { record } => write!(f, "index after {record}"),
        }
    }
}

/// Errors returned by the index manager and record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("ledger write failed ({stage}, key={key}): {reason}")]
    LedgerWriteFailed {
        key: String,
        stage: WriteStage,
        reason: String,
    },
    #[error("ledger read failed (key={key}): {reason}")]
    LedgerReadFailed { key: String, reason: String },
    /// The availability probe reported the ledger unreachable.
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),
    #[error("malformed record (key={key}): {reason}")]
    MalformedRecord { key: String, reason: String },
    #[error("schema violation (key={key}): {reason}")]
    SchemaViolation { key: String, reason: String },
    #[error("corrupt index (key={key}): {reason}")]
    CorruptIndex { key: String, reason: String },
    #[error("record not found: {0}")]
    RecordNotFound(RecordId),
    #[error("invalid transition: record {id} is already {status}")]
    InvalidTransition { id: RecordId, status: RecordStatus },
    #[error("connect an account before writing to the ledger")]
    IdentityRequired,
    #[error("payload encryption failed: {0}")]
    Encryption(#[from] CipherError),
    /// Every generated id collided with an existing key.
    #[error("could not allocate a fresh record id after {attempts} attempts")]
    IdExhausted { attempts: usize },
}

impl StoreError {
    /// The record reached the ledger but is not listed in the index yet.
    pub fn is_persisted_unindexed(&self) -> bool {
        matches!(
            self,
            StoreError::LedgerWriteFailed {
                stage: WriteStage::Index { .. },
                ..
            }
        )
    }

    /// Attach the ledger key a codec error was raised for.
    pub(crate) fn from_codec(key: &str, err: CodecError) -> Self {
        match err {
            CodecError::Malformed(reason) | CodecError::Encode(reason) => {
                StoreError::MalformedRecord {
                    key: key.to_string(),
                    reason,
                }
            }
            CodecError::SchemaViolation(reason) => StoreError::SchemaViolation {
                key: key.to_string(),
                reason,
            },
        }
    }
}
