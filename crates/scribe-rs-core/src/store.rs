//! Record store: create, list and transition records over the ledger.
//!
//! Creation is a two-phase append. The record body is written under its own
//! key first and the index second. A failure between the two leaves the
//! record persisted but unlisted; such ids are remembered as orphans until
//! `reconcile` indexes them.

use crate::cipher::{EncryptionContext, PayloadCipher};
use crate::clock::{Clock, SystemClock};
use crate::codec::RecordCodec;
use crate::error::{StoreError, WriteStage};
use crate::identity::{IdentityProvider, require_account};
use crate::index::{IndexManager, IndexWarning};
use crate::projection;
use log::{debug, info, warn};
use parking_lot::Mutex;
use scribe_rs_config::LedgerConfig;
use scribe_rs_ledger::LedgerClient;
use scribe_rs_protocol::{Category, Record, RecordId, Transition};
use std::collections::BTreeSet;
use std::sync::Arc;

/// How many fresh ids `create` tries before giving up on collisions.
pub const MAX_ID_ATTEMPTS: usize = 3;

/// Key layout inside the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    /// Reserved key for the index blob.
    pub index_key: String,
    /// Prepended to an id to form the record key.
    pub record_prefix: String,
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self::from(&LedgerConfig::default())
    }
}

impl From<&LedgerConfig> for StoreLayout {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            index_key: config.index_key.clone(),
            record_prefix: config.record_prefix.clone(),
        }
    }
}

/// A listed id that could not be materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub id: RecordId,
    pub reason: String,
}

/// Everything one refresh learned about the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSnapshot {
    /// Materialized records, newest first.
    pub records: Vec<Record>,
    pub skipped: Vec<SkippedRecord>,
    pub index_warning: Option<IndexWarning>,
}

pub struct RecordStore {
    ledger: Arc<dyn LedgerClient>,
    codec: RecordCodec,
    index: IndexManager,
    identity: Arc<dyn IdentityProvider>,
    clock: Arc<dyn Clock>,
    layout: StoreLayout,
    orphans: Mutex<BTreeSet<RecordId>>,
}

impl RecordStore {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        identity: Arc<dyn IdentityProvider>,
        cipher: Arc<dyn PayloadCipher>,
        layout: StoreLayout,
    ) -> Self {
        let codec = RecordCodec::new(cipher);
        let index = IndexManager::new(ledger.clone(), codec.clone(), layout.index_key.clone());
        Self {
            ledger,
            codec,
            index,
            identity,
            clock: Arc::new(SystemClock),
            layout,
            orphans: Mutex::new(BTreeSet::new()),
        }
    }

    /// Replace the clock used to stamp new records.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn index(&self) -> &IndexManager {
        &self.index
    }

    /// Ledger key holding the record with `id`.
    pub fn record_key(&self, id: &RecordId) -> String {
        format!("{}{}", self.layout.record_prefix, id)
    }

    /// Encrypt `plaintext` and persist a new pending record.
    ///
    /// Fails with `LedgerWriteFailed` if either write fails. When the stage is
    /// `WriteStage::Index` the record is already in the ledger and tracked as
    /// an orphan.
    pub async fn create(
        &self,
        owner_id: &str,
        category: Category,
        plaintext: &str,
    ) -> Result<Record, StoreError> {
        let account = require_account(self.identity.as_ref())?;
        let now = self.clock.now();
        let id = self.allocate_id(now.timestamp_millis()).await?;
        let created_at = now.timestamp();

        let context = EncryptionContext {
            record_id: id.clone(),
            owner_id: owner_id.to_string(),
            category,
            created_at,
        };
        let payload = self.codec.encrypt_payload(plaintext, &context)?;
        let record = Record::pending(id.clone(), payload, created_at, owner_id, category);

        let key = self.record_key(&id);
        self.write_record(&key, &record).await?;
        debug!("record written (key={}, account={})", key, account);

        if let Err(err) = self.index.append_key(&id).await {
            self.orphans.lock().insert(id.clone());
            warn!("record persisted but not indexed (id={}, err={})", id, err);
            return Err(match err {
                err @ StoreError::LedgerWriteFailed { .. } => err,
                other => StoreError::LedgerWriteFailed {
                    key: self.index.key().to_string(),
                    stage: WriteStage::Index { record: id },
                    reason: other.to_string(),
                },
            });
        }
        info!(
            "record created (id={}, owner={}, category={})",
            record.id, record.owner_id, record.category
        );
        Ok(record)
    }

    /// Materialize every indexed record, newest first.
    pub async fn list_all(&self) -> Result<Vec<Record>, StoreError> {
        Ok(self.refresh().await?.records)
    }

    /// Materialize every indexed record and report what was skipped.
    ///
    /// Per-record read or decode failures are logged and skipped; only index
    /// and availability failures abort.
    pub async fn refresh(&self) -> Result<RecordSnapshot, StoreError> {
        match self.ledger.is_available().await {
            Ok(true) => {}
            Ok(false) => {
                return Err(StoreError::LedgerUnavailable(
                    "availability probe reported the ledger offline".to_string(),
                ));
            }
            Err(err) => return Err(StoreError::LedgerUnavailable(err.to_string())),
        }

        let listing = self.index.list_keys().await?;
        let mut snapshot = RecordSnapshot {
            index_warning: listing.warning,
            ..RecordSnapshot::default()
        };
        for id in listing.keys {
            match self.fetch(&id).await {
                Ok(Some(record)) => snapshot.records.push(record),
                Ok(None) => {
                    warn!("indexed record missing, skipping (id={})", id);
                    snapshot.skipped.push(SkippedRecord {
                        id,
                        reason: "record key is empty".to_string(),
                    });
                }
                Err(err) => {
                    warn!("failed to load record, skipping (id={}, err={})", id, err);
                    snapshot.skipped.push(SkippedRecord {
                        id,
                        reason: err.to_string(),
                    });
                }
            }
        }
        projection::sort_newest_first(&mut snapshot.records);
        debug!(
            "refresh complete (records={}, skipped={})",
            snapshot.records.len(),
            snapshot.skipped.len()
        );
        Ok(snapshot)
    }

    /// Read and decode a single record. Empty bytes count as absent.
    pub async fn fetch(&self, id: &RecordId) -> Result<Option<Record>, StoreError> {
        let key = self.record_key(id);
        let bytes = self
            .ledger
            .read(&key)
            .await
            .map_err(|err| StoreError::LedgerReadFailed {
                key: key.clone(),
                reason: err.to_string(),
            })?;
        match bytes.filter(|bytes| !bytes.is_empty()) {
            None => Ok(None),
            Some(bytes) => self
                .codec
                .decode_stored(id, &bytes)
                .map(Some)
                .map_err(|err| StoreError::from_codec(&key, err)),
        }
    }

    /// Apply a one-shot transition out of `pending` and write it back.
    ///
    /// Read-modify-write without a lock; callers serialize per id.
    pub async fn transition_status(
        &self,
        id: &RecordId,
        transition: Transition,
    ) -> Result<Record, StoreError> {
        require_account(self.identity.as_ref())?;
        let record = self
            .fetch(id)
            .await?
            .ok_or_else(|| StoreError::RecordNotFound(id.clone()))?;
        let next = record
            .transitioned(&transition)
            .ok_or_else(|| StoreError::InvalidTransition {
                id: id.clone(),
                status: record.status,
            })?;
        self.write_record(&self.record_key(id), &next).await?;
        info!("record transitioned (id={}, status={})", id, next.status);
        Ok(next)
    }

    /// Ids persisted by this process whose index append failed.
    pub fn orphans(&self) -> Vec<RecordId> {
        self.orphans.lock().iter().cloned().collect()
    }

    /// Track an id persisted by an earlier process so `reconcile` indexes it.
    ///
    /// Returns false when no decodable record exists under the id.
    pub async fn adopt_orphan(&self, id: &RecordId) -> Result<bool, StoreError> {
        if self.fetch(id).await?.is_none() {
            return Ok(false);
        }
        self.orphans.lock().insert(id.clone());
        Ok(true)
    }

    /// Retry the index append for every orphan; returns the ids now indexed.
    pub async fn reconcile(&self) -> Result<Vec<RecordId>, StoreError> {
        require_account(self.identity.as_ref())?;
        let pending = self.orphans();
        let mut recovered = Vec::new();
        for id in pending {
            match self.index.append_key(&id).await {
                Ok(outcome) => {
                    debug!("orphan indexed (id={}, outcome={:?})", id, outcome);
                    self.orphans.lock().remove(&id);
                    recovered.push(id);
                }
                Err(err) => warn!("orphan still unindexed (id={}, err={})", id, err),
            }
        }
        if !recovered.is_empty() {
            info!("reconciled orphans (count={})", recovered.len());
        }
        Ok(recovered)
    }

    /// Pick an id whose key is unused, retrying on collision.
    async fn allocate_id(&self, millis: i64) -> Result<RecordId, StoreError> {
        for attempt in 1..=MAX_ID_ATTEMPTS {
            let id = RecordId::generate_at(millis);
            let key = self.record_key(&id);
            if key == self.layout.index_key {
                continue;
            }
            let existing = self
                .ledger
                .read(&key)
                .await
                .map_err(|err| StoreError::LedgerReadFailed {
                    key: key.clone(),
                    reason: err.to_string(),
                })?;
            if existing.is_some_and(|bytes| !bytes.is_empty()) {
                warn!("record id collided, regenerating (id={}, attempt={})", id, attempt);
                continue;
            }
            return Ok(id);
        }
        Err(StoreError::IdExhausted {
            attempts: MAX_ID_ATTEMPTS,
        })
    }

    async fn write_record(&self, key: &str, record: &Record) -> Result<(), StoreError> {
        let bytes = self
            .codec
            .encode(record)
            .map_err(|err| StoreError::from_codec(key, err))?;
        self.ledger
            .write(key, &bytes)
            .await
            .map_err(|err| StoreError::LedgerWriteFailed {
                key: key.to_string(),
                stage: WriteStage::Record,
                reason: err.to_string(),
            })
    }
}
