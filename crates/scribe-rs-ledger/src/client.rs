//! Ledger client abstraction.

use crate::error::LedgerError;
use async_trait::async_trait;

#[async_trait]
/// Minimal key/value surface of the external ledger.
///
/// Each call is serialized by the ledger on its own; there is no
/// compare-and-swap and no cross-call transaction.
pub trait LedgerClient: Send + Sync {
    /// Read the bytes stored under `key`, or `None` if the key was never set.
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError>;

    /// Replace the bytes stored under `key`.
    async fn write(&self, key: &str, bytes: &[u8]) -> Result<(), LedgerError>;

    /// Report whether the ledger is currently serving requests.
    async fn is_available(&self) -> Result<bool, LedgerError> {
        Ok(true)
    }
}
