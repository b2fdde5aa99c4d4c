//! Deadline wrapper that turns hung ledger calls into errors.

use crate::client::LedgerClient;
use crate::error::LedgerError;
use async_trait::async_trait;
use log::warn;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Wraps a ledger and fails any call that outlives `deadline`.
///
/// An expired write may still land on the ledger later; the caller only
/// learns that it stopped waiting.
#[derive(Clone)]
pub struct DeadlineLedger {
    inner: Arc<dyn LedgerClient>,
    deadline: Duration,
}

impl DeadlineLedger {
    pub fn new(inner: Arc<dyn LedgerClient>, deadline: Duration) -> Self {
        Self { inner, deadline }
    }

    async fn bounded<T>(
        &self,
        call: &str,
        key: &str,
        fut: impl Future<Output = Result<T, LedgerError>>,
    ) -> Result<T, LedgerError> {
        match tokio::time::timeout(self.deadline, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "ledger call exceeded deadline (call={}, key={}, deadline_ms={})",
                    call,
                    key,
                    self.deadline.as_millis()
                );
                Err(LedgerError::Timeout(self.deadline))
            }
        }
    }
}

#[async_trait]
impl LedgerClient for DeadlineLedger {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        self.bounded("read", key, self.inner.read(key)).await
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> Result<(), LedgerError> {
        self.bounded("write", key, self.inner.write(key, bytes)).await
    }

    async fn is_available(&self) -> Result<bool, LedgerError> {
        self.bounded("is_available", "", self.inner.is_available()).await
    }
}
