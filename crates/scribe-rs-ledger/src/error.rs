//! Error types for ledger operations.

use std::time::Duration;

/// Errors returned by ledger clients.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The ledger or the signer refused the call.
    #[error("rejected: {0}")]
    Rejected(String),
    /// The ledger is not reachable.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
    /// The call did not resolve before its deadline.
    #[error("ledger call timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    /// Key cannot be stored by this backend.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}
