use async_trait::async_trait;
use parking_lot::Mutex;
use scribe_rs_ledger::{LedgerClient, LedgerError, MemoryLedger};
use std::collections::{HashMap, HashSet};

/// A single call observed by `ScriptedLedger`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    Read(String),
    Write(String),
}

/// In-memory ledger with injectable per-key failures and a call log.
#[derive(Default)]
pub struct ScriptedLedger {
    inner: MemoryLedger,
    failing_writes: Mutex<HashMap<String, String>>,
    failing_reads: Mutex<HashSet<String>>,
    reject_all: Mutex<Option<String>>,
    calls: Mutex<Vec<LedgerCall>>,
}

impl ScriptedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backing store, for seeding raw bytes and inspecting state.
    pub fn inner(&self) -> &MemoryLedger {
        &self.inner
    }

    /// Reject every write to `key` with `reason`.
    pub fn fail_writes_to(&self, key: impl Into<String>, reason: impl Into<String>) {
        self.failing_writes.lock().insert(key.into(), reason.into());
    }

    /// Make reads of `key` fail as if the ledger were unreachable.
    pub fn fail_reads_of(&self, key: impl Into<String>) {
        self.failing_reads.lock().insert(key.into());
    }

    /// Reject every write, whatever the key.
    pub fn reject_all_writes(&self, reason: impl Into<String>) {
        *self.reject_all.lock() = Some(reason.into());
    }

    pub fn clear_failures(&self) {
        self.failing_writes.lock().clear();
        self.reject_all.lock().take();
        self.failing_reads.lock().clear();
    }

    pub fn calls(&self) -> Vec<LedgerCall> {
        self.calls.lock().clone()
    }

    /// Keys written so far, in call order.
    pub fn writes(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                LedgerCall::Write(key) => Some(key.clone()),
                LedgerCall::Read(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl LedgerClient for ScriptedLedger {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        self.calls.lock().push(LedgerCall::Read(key.to_string()));
        if self.failing_reads.lock().contains(key) {
            return Err(LedgerError::Unavailable(format!("scripted read failure for {key}")));
        }
        self.inner.read(key).await
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> Result<(), LedgerError> {
        self.calls.lock().push(LedgerCall::Write(key.to_string()));
        let reason = self
            .reject_all
            .lock()
            .clone()
            .or_else(|| self.failing_writes.lock().get(key).cloned());
        if let Some(reason) = reason {
            return Err(LedgerError::Rejected(reason));
        }
        self.inner.write(key, bytes).await
    }

    async fn is_available(&self) -> Result<bool, LedgerError> {
        self.inner.is_available().await
    }
}
