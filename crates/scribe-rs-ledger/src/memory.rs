//! In-process ledger backed by a hash map.

use crate::client::LedgerClient;
use crate::error::LedgerError;
use async_trait::async_trait;
use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Ledger that keeps every key in memory. Useful for tests and dry runs.
#[derive(Debug)]
pub struct MemoryLedger {
    entries: RwLock<HashMap<String, Vec<u8>>>,
    available: AtomicBool,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    /// Create an empty, available ledger.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Seed a ledger with raw entries.
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        let ledger = Self::new();
        {
            let mut map = ledger.entries.write();
            for (key, value) in entries {
                map.insert(key.into(), value.into());
            }
        }
        ledger
    }

    /// Overwrite a key without going through the async client surface.
    pub fn put_raw(&self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.write().insert(key.into(), bytes.into());
    }

    /// Fetch a key without going through the async client surface.
    pub fn get_raw(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.read().get(key).cloned()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Toggle the availability probe.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        let value = self.entries.read().get(key).cloned();
        debug!(
            "memory ledger read (key={}, found={})",
            key,
            value.is_some()
        );
        Ok(value)
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> Result<(), LedgerError> {
        if key.is_empty() {
            return Err(LedgerError::InvalidKey("empty key".to_string()));
        }
        self.entries.write().insert(key.to_string(), bytes.to_vec());
        debug!("memory ledger write (key={}, len={})", key, bytes.len());
        Ok(())
    }

    async fn is_available(&self) -> Result<bool, LedgerError> {
        Ok(self.available.load(Ordering::SeqCst))
    }
}
