//! Key/value ledger boundary for Scribe.
//!
//! The ledger only offers single-key reads and writes. Nothing here provides
//! multi-key atomicity; callers build their protocols on top of that.

pub mod client;
pub mod deadline;
pub mod error;
pub mod file;
pub mod memory;

/// Ledger error type.
pub use error::LedgerError;
/// Ledger client interface.
pub use client::LedgerClient;
/// Deadline wrapper for slow ledgers.
pub use deadline::DeadlineLedger;
/// File-backed ledger.
pub use file::FileLedger;
/// In-process ledger.
pub use memory::MemoryLedger;
