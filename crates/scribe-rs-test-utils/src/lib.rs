//! Test helpers shared across Scribe crates.

pub mod analyzer;
pub mod ledger;
pub mod session;

pub use analyzer::{FailingAnalyzer, FixedAnalyzer, GatedAnalyzer};
pub use ledger::{LedgerCall, ScriptedLedger};
pub use session::{FailingCipher, FixedCipher, RecordingSink, StaticIdentity, SteppingClock};
