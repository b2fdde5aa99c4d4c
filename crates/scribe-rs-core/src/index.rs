//! The index blob: an ordered list of record ids under one reserved key.
//!
//! Appends are read-modify-write with no lock. Two concurrent appends can
//! lose one id (last writer wins); the lost record stays in the ledger but is
//! not listed. An undecodable index is copied to a backup key and rebuilt
//! from empty on the next append.

use crate::codec::RecordCodec;
use crate::error::{StoreError, WriteStage};
use log::{debug, info, warn};
use scribe_rs_ledger::LedgerClient;
use scribe_rs_protocol::RecordId;
use std::collections::HashSet;
use std::sync::Arc;

/// Non-fatal problem found while listing the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexWarning {
    /// The blob could not be decoded and was treated as empty.
    Corrupt { reason: String },
    /// Repeated ids were dropped, keeping first occurrences.
    Duplicates { dropped: usize },
}

/// Result of `IndexManager::list_keys`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexListing {
    pub keys: Vec<RecordId>,
    pub warning: Option<IndexWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    /// The id was already listed; nothing was written.
    AlreadyPresent,
    /// The old blob was undecodable; it was backed up and the index now
    /// lists only this id.
    Rebuilt,
}

/// Suffix of the key that keeps the last undecodable index blob.
pub const CORRUPT_BACKUP_SUFFIX: &str = ".corrupt";

/// Reads and appends to the index blob.
#[derive(Clone)]
pub struct IndexManager {
    ledger: Arc<dyn LedgerClient>,
    codec: RecordCodec,
    key: String,
}

impl IndexManager {
    pub fn new(ledger: Arc<dyn LedgerClient>, codec: RecordCodec, key: impl Into<String>) -> Self {
        Self {
            ledger,
            codec,
            key: key.into(),
        }
    }

    /// Reserved key the index lives under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Key holding the last undecodable blob replaced by `append_key`.
    pub fn backup_key(&self) -> String {
        format!("{}{}", self.key, CORRUPT_BACKUP_SUFFIX)
    }

    /// Current ids in index order. An absent index is empty; an undecodable
    /// one is empty with a warning.
    pub async fn list_keys(&self) -> Result<IndexListing, StoreError> {
        let Some(bytes) = self.read_bytes().await? else {
            debug!("index absent (key={})", self.key);
            return Ok(IndexListing::default());
        };
        match self.codec.decode_index(&bytes) {
            Ok(ids) => {
                let (keys, dropped) = dedupe(ids);
                let warning = (dropped > 0).then(|| {
                    warn!(
                        "index lists duplicate ids (key={}, dropped={})",
                        self.key, dropped
                    );
                    IndexWarning::Duplicates { dropped }
                });
                Ok(IndexListing { keys, warning })
            }
            Err(err) => {
                warn!("index corrupt, listing nothing (key={}, err={})", self.key, err);
                Ok(IndexListing {
                    keys: Vec::new(),
                    warning: Some(IndexWarning::Corrupt {
                        reason: err.to_string(),
                    }),
                })
            }
        }
    }

    /// Add `id` to the index unless it is already there.
    ///
    /// Must only be called once the record's own key has been written. An
    /// undecodable index is copied to `backup_key` and replaced by a fresh
    /// index; if the copy cannot be written the blob is left untouched and the
    /// append fails with `CorruptIndex`.
    pub async fn append_key(&self, id: &RecordId) -> Result<AppendOutcome, StoreError> {
        let (ids, rebuilt) = match self.read_bytes().await? {
            None => (Vec::new(), false),
            Some(bytes) => match self.codec.decode_index(&bytes) {
                Ok(ids) => (ids, false),
                Err(err) => {
                    self.back_up(&bytes, &err.to_string()).await?;
                    (Vec::new(), true)
                }
            },
        };
        let (mut ids, _) = dedupe(ids);
        if ids.contains(id) {
            debug!("index already lists id (key={}, id={})", self.key, id);
            return Ok(AppendOutcome::AlreadyPresent);
        }
        ids.push(id.clone());

        let stage = WriteStage::Index { record: id.clone() };
        let bytes = self
            .codec
            .encode_index(&ids)
            .map_err(|err| StoreError::LedgerWriteFailed {
                key: self.key.clone(),
                stage: stage.clone(),
                reason: err.to_string(),
            })?;
        self.ledger
            .write(&self.key, &bytes)
            .await
            .map_err(|err| StoreError::LedgerWriteFailed {
                key: self.key.clone(),
                stage,
                reason: err.to_string(),
            })?;
        info!("index appended (key={}, id={}, len={})", self.key, id, ids.len());
        Ok(if rebuilt {
            AppendOutcome::Rebuilt
        } else {
            AppendOutcome::Appended
        })
    }

    /// Copy an undecodable blob aside before it is overwritten.
    async fn back_up(&self, bytes: &[u8], reason: &str) -> Result<(), StoreError> {
        let backup = self.backup_key();
        self.ledger
            .write(&backup, bytes)
            .await
            .map_err(|err| StoreError::CorruptIndex {
                key: self.key.clone(),
                reason: format!("{reason}; backup to {backup} failed: {err}"),
            })?;
        warn!(
            "index corrupt, rebuilding from empty (key={}, backup={}, err={})",
            self.key, backup, reason
        );
        Ok(())
    }

    /// Raw index bytes; empty bytes count as absent.
    async fn read_bytes(&self) -> Result<Option<Vec<u8>>, StoreError> {
        let bytes = self
            .ledger
            .read(&self.key)
            .await
            .map_err(|err| StoreError::LedgerReadFailed {
                key: self.key.clone(),
                reason: err.to_string(),
            })?;
        Ok(bytes.filter(|bytes| !bytes.is_empty()))
    }
}

/// Drop repeated ids keeping first occurrences; returns how many were dropped.
fn dedupe(ids: Vec<RecordId>) -> (Vec<RecordId>, usize) {
    let total = ids.len();
    let mut seen = HashSet::with_capacity(total);
    let kept: Vec<RecordId> = ids.into_iter().filter(|id| seen.insert(id.clone())).collect();
    let dropped = total - kept.len();
    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::DigestCipher;
    use pretty_assertions::assert_eq;
    use scribe_rs_ledger::MemoryLedger;

    const KEY: &str = "sample_keys";

    fn manager(ledger: Arc<MemoryLedger>) -> IndexManager {
        let codec = RecordCodec::new(Arc::new(DigestCipher::new("T-")));
        IndexManager::new(ledger, codec, KEY)
    }

    #[tokio::test]
    async fn absent_and_empty_index_list_nothing() {
        let ledger = Arc::new(MemoryLedger::new());
        let index = manager(ledger.clone());
        assert_eq!(index.list_keys().await.expect("list"), IndexListing::default());

        ledger.put_raw(KEY, Vec::new());
        assert_eq!(index.list_keys().await.expect("list"), IndexListing::default());
    }

    #[tokio::test]
    async fn append_is_idempotent() {
        let ledger = Arc::new(MemoryLedger::new());
        let index = manager(ledger.clone());
        let id = RecordId::new("1-a");
        assert_eq!(index.append_key(&id).await.expect("append"), AppendOutcome::Appended);
        let before = ledger.get_raw(KEY);
        assert_eq!(
            index.append_key(&id).await.expect("append"),
            AppendOutcome::AlreadyPresent
        );
        assert_eq!(ledger.get_raw(KEY), before);
        assert_eq!(index.list_keys().await.expect("list").keys, vec![id]);
    }

    #[tokio::test]
    async fn corrupt_index_lists_empty_with_warning() {
        let ledger = Arc::new(MemoryLedger::new());
        ledger.put_raw(KEY, b"not-json".to_vec());
        let listing = manager(ledger).list_keys().await.expect("list");
        assert!(listing.keys.is_empty());
        assert!(matches!(listing.warning, Some(IndexWarning::Corrupt { .. })));
    }

    #[tokio::test]
    async fn append_rebuilds_corrupt_index_after_backing_it_up() {
        let ledger = Arc::new(MemoryLedger::new());
        ledger.put_raw(KEY, b"not-json".to_vec());
        let index = manager(ledger.clone());
        let first = RecordId::new("1-a");
        assert_eq!(index.append_key(&first).await.expect("append"), AppendOutcome::Rebuilt);
        assert_eq!(ledger.get_raw("sample_keys.corrupt"), Some(b"not-json".to_vec()));

        let second = RecordId::new("2-b");
        assert_eq!(index.append_key(&second).await.expect("append"), AppendOutcome::Appended);
        let listing = index.list_keys().await.expect("list");
        assert_eq!(listing.keys, vec![first, second]);
        assert_eq!(listing.warning, None);
    }

    #[tokio::test]
    async fn duplicates_are_dropped_in_order() {
        let ledger = Arc::new(MemoryLedger::new());
        ledger.put_raw(KEY, br#"["b","a","b","c","a"]"#.to_vec());
        let listing = manager(ledger).list_keys().await.expect("list");
        let keys: Vec<&str> = listing.keys.iter().map(RecordId::as_str).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(listing.warning, Some(IndexWarning::Duplicates { dropped: 2 }));
    }
}
