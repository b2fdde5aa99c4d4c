//! User-facing workflow: submit and analyze samples while driving the
//! operation status and keeping a cached snapshot fresh.

use crate::analysis::{AnalysisError, Analyzer};
use crate::error::StoreError;
use crate::identity::{IdentityProvider, require_account};
use crate::operation::OperationTracker;
use crate::projection::{self, CategoryFilter, Dashboard};
use crate::store::{RecordSnapshot, RecordStore};
use log::{info, warn};
use parking_lot::{Mutex, RwLock};
use scribe_rs_protocol::{Category, OperationKind, OperationState, Record, RecordId, Transition};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub const ENCRYPTING_MESSAGE: &str = "Encrypting writing data with FHE...";
pub const UPLOADED_MESSAGE: &str = "Encrypted writing sample uploaded securely!";
pub const REJECTED_MESSAGE: &str = "Transaction rejected by user";
pub const PROCESSING_MESSAGE: &str = "Processing encrypted writing data with FHE...";
pub const ANALYZED_MESSAGE: &str = "FHE analysis completed successfully!";

/// Marker a signer puts in its error when the user declines to sign.
const USER_REJECTED_MARKER: &str = "user rejected transaction";

#[derive(Debug, Error)]
pub enum DeskError {
    #[error("invalid draft: {0}")]
    InvalidDraft(String),
    #[error("analysis already running for record {0}")]
    AnalysisInFlight(RecordId),
    #[error("record {id} belongs to {owner}, not the connected account")]
    NotOwner { id: RecordId, owner: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl DeskError {
    /// The caller should prompt the user to connect an account.
    pub fn is_identity_required(&self) -> bool {
        matches!(self, DeskError::Store(StoreError::IdentityRequired))
    }
}

/// A sample as entered by the user, before encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleDraft {
    pub owner_id: String,
    pub category: Category,
    pub content: String,
}

impl SampleDraft {
    pub fn new(owner_id: impl Into<String>, category: Category, content: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            category,
            content: content.into(),
        }
    }

    fn validate(&self) -> Result<(), DeskError> {
        if self.owner_id.trim().is_empty() {
            return Err(DeskError::InvalidDraft("owner id is required".to_string()));
        }
        if self.content.trim().is_empty() {
            return Err(DeskError::InvalidDraft("sample content is required".to_string()));
        }
        Ok(())
    }
}

/// Removes a record from the in-flight set when analysis ends.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<RecordId>>,
    id: RecordId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.id);
    }
}

pub struct SampleDesk {
    store: Arc<RecordStore>,
    identity: Arc<dyn IdentityProvider>,
    analyzer: Arc<dyn Analyzer>,
    tracker: OperationTracker,
    records: RwLock<Vec<Record>>,
    analyzing: Mutex<HashSet<RecordId>>,
}

impl SampleDesk {
    pub fn new(
        store: Arc<RecordStore>,
        identity: Arc<dyn IdentityProvider>,
        analyzer: Arc<dyn Analyzer>,
        tracker: OperationTracker,
    ) -> Self {
        Self {
            store,
            identity,
            analyzer,
            tracker,
            records: RwLock::new(Vec::new()),
            analyzing: Mutex::new(HashSet::new()),
        }
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    pub fn tracker(&self) -> &OperationTracker {
        &self.tracker
    }

    /// Currently displayed operation.
    pub fn operation(&self) -> OperationState {
        self.tracker.state()
    }

    /// Cached snapshot from the last refresh, newest first.
    pub fn records(&self) -> Vec<Record> {
        self.records.read().clone()
    }

    pub fn filtered(&self, search: &str, category: CategoryFilter) -> Vec<Record> {
        projection::filter(&self.records.read(), search, category)
    }

    pub fn dashboard(&self) -> Dashboard {
        Dashboard::from_records(&self.records.read())
    }

    /// Rebuild the cached snapshot from the ledger.
    pub async fn refresh(&self) -> Result<RecordSnapshot, DeskError> {
        let snapshot = self.store.refresh().await?;
        *self.records.write() = snapshot.records.clone();
        Ok(snapshot)
    }

    /// Encrypt and upload a new sample.
    ///
    /// A missing identity is reported before any operation begins; every
    /// other failure settles the operation as an error.
    pub async fn submit(&self, draft: SampleDraft) -> Result<Record, DeskError> {
        require_account(self.identity.as_ref())?;

        let ticket = self.tracker.begin(OperationKind::Create, ENCRYPTING_MESSAGE);
        match self.upload(&draft).await {
            Ok(record) => {
                self.tracker.succeed(ticket, UPLOADED_MESSAGE);
                self.reload().await;
                Ok(record)
            }
            Err(err) => {
                self.tracker.fail(ticket, upload_failure_message(&err));
                Err(err)
            }
        }
    }

    /// Fetch `id` and check that the connected account may analyze it: the
    /// record must be pending and owned by that account.
    pub async fn ensure_analyzable(&self, id: &RecordId) -> Result<Record, DeskError> {
        let account = require_account(self.identity.as_ref())?;
        let record = self
            .store
            .fetch(id)
            .await?
            .ok_or_else(|| StoreError::RecordNotFound(id.clone()))?;
        if projection::can_analyze(&record, Some(account.as_str())) {
            return Ok(record);
        }
        if record.status.is_terminal() {
            return Err(StoreError::InvalidTransition {
                id: id.clone(),
                status: record.status,
            }
            .into());
        }
        Err(DeskError::NotOwner {
            id: id.clone(),
            owner: record.owner_id,
        })
    }

    /// Run analysis on a pending record and store its result.
    ///
    /// A second call for the same record while one is running is refused.
    /// Ownership is not checked here; see `ensure_analyzable`.
    pub async fn analyze(&self, id: &RecordId) -> Result<Record, DeskError> {
        require_account(self.identity.as_ref())?;
        let _in_flight = self.claim(id)?;

        let ticket = self.tracker.begin(OperationKind::Analyze, PROCESSING_MESSAGE);
        match self.run_analysis(id).await {
            Ok(record) => {
                self.tracker.succeed(ticket, ANALYZED_MESSAGE);
                self.reload().await;
                Ok(record)
            }
            Err(err) => {
                self.tracker.fail(ticket, format!("Analysis failed: {err}"));
                Err(err)
            }
        }
    }

    async fn upload(&self, draft: &SampleDraft) -> Result<Record, DeskError> {
        draft.validate()?;
        Ok(self
            .store
            .create(&draft.owner_id, draft.category, &draft.content)
            .await?)
    }

    async fn run_analysis(&self, id: &RecordId) -> Result<Record, DeskError> {
        let record = self
            .store
            .fetch(id)
            .await?
            .ok_or_else(|| StoreError::RecordNotFound(id.clone()))?;
        if record.status.is_terminal() {
            return Err(StoreError::InvalidTransition {
                id: id.clone(),
                status: record.status,
            }
            .into());
        }
        match self.analyzer.analyze(&record).await {
            Ok(result) => Ok(self
                .store
                .transition_status(id, Transition::Complete(result))
                .await?),
            Err(err) => {
                if let Err(mark_err) = self.store.transition_status(id, Transition::Fail).await {
                    warn!("could not mark record failed (id={}, err={})", id, mark_err);
                }
                Err(err.into())
            }
        }
    }

    fn claim(&self, id: &RecordId) -> Result<InFlight<'_>, DeskError> {
        if !self.analyzing.lock().insert(id.clone()) {
            return Err(DeskError::AnalysisInFlight(id.clone()));
        }
        Ok(InFlight {
            set: &self.analyzing,
            id: id.clone(),
        })
    }

    /// Refresh after a successful write; failures leave the old snapshot.
    async fn reload(&self) {
        match self.refresh().await {
            Ok(snapshot) => info!("snapshot reloaded (records={})", snapshot.records.len()),
            Err(err) => warn!("snapshot reload failed (err={})", err),
        }
    }
}

/// Status line for a failed upload.
pub fn upload_failure_message(err: &impl fmt::Display) -> String {
    let text = err.to_string();
    if text.to_lowercase().contains(USER_REJECTED_MARKER) {
        REJECTED_MESSAGE.to_string()
    } else {
        format!("Upload failed: {text}")
    }
}
