//! Record protocol for Scribe over a single-key ledger.
//!
//! This crate owns the codec, the index manager, the record store with its
//! two-phase append, the operation tracker, the pure view projections, and
//! the `SampleDesk` workflow that ties them together.

pub mod analysis;
pub mod cipher;
pub mod clock;
pub mod codec;
pub mod desk;
pub mod error;
pub mod identity;
pub mod index;
pub mod operation;
pub mod projection;
pub mod store;

pub use analysis::{AnalysisError, Analyzer, RecommendationAnalyzer};
pub use cipher::{CipherError, DigestCipher, EncryptionContext, PayloadCipher};
pub use clock::{Clock, SystemClock};
pub use codec::{CodecError, RecordCodec};
pub use desk::{DeskError, SampleDesk, SampleDraft};
pub use error::{StoreError, WriteStage};
pub use identity::{IdentityProvider, SessionIdentity, require_account};
pub use index::{AppendOutcome, IndexListing, IndexManager, IndexWarning};
pub use operation::{DisplayTimeouts, OperationBus, OperationTicket, OperationTracker};
pub use projection::{CategoryFilter, Dashboard, StatusShare};
pub use store::{RecordSnapshot, RecordStore, SkippedRecord, StoreLayout};
