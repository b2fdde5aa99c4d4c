//! Public SDK surface for Scribe.
//!
//! This crate re-exports the building blocks and wires a ready-to-use
//! `SampleDesk` from a `ScribeConfig`.

/// Re-export for convenience.
pub use scribe_rs_config as config;
pub use scribe_rs_core as core;
/// Re-export for convenience.
pub use scribe_rs_ledger as ledger;
/// Re-export for convenience.
pub use scribe_rs_protocol as protocol;

use log::info;
use scribe_rs_config::{ConfigError, LedgerBackend, LedgerConfig, ScribeConfig};
use scribe_rs_core::{
    DigestCipher, DisplayTimeouts, OperationBus, OperationTracker, RecommendationAnalyzer,
    RecordStore, SampleDesk, SessionIdentity, StoreLayout,
};
use scribe_rs_ledger::{DeadlineLedger, FileLedger, LedgerClient, LedgerError, MemoryLedger};
use scribe_rs_protocol::OperationEvent;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;

/// File ledger location when `ledger.path` is unset, relative to the base dir.
pub const DEFAULT_LEDGER_DIR: &str = ".scribe/ledger";
/// Buffered operation events per subscriber.
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum ScribeError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
///
/// This is a no-op if the feature is not enabled. Binaries are still expected
/// to call this early in startup to ensure log output is wired up.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::builder()
            .format_timestamp_millis()
            .parse_default_env()
            .try_init();
    }
}

/// Open the ledger described by `config`. Relative file paths resolve
/// against `base`.
pub fn open_ledger(config: &LedgerConfig, base: &Path) -> Result<Arc<dyn LedgerClient>, ScribeError> {
    let ledger: Arc<dyn LedgerClient> = match config.backend {
        LedgerBackend::Memory => Arc::new(MemoryLedger::new()),
        LedgerBackend::File => {
            let path = config
                .path
                .as_deref()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LEDGER_DIR));
            let path = if path.is_relative() {
                base.join(path)
            } else {
                path
            };
            Arc::new(FileLedger::new(path)?)
        }
    };
    Ok(match config.deadline_ms {
        Some(ms) => Arc::new(DeadlineLedger::new(ledger, Duration::from_millis(ms))),
        None => ledger,
    })
}

/// A configured client: identity session, desk and operation event bus.
pub struct Scribe {
    config: ScribeConfig,
    identity: Arc<SessionIdentity>,
    bus: OperationBus,
    desk: Arc<SampleDesk>,
}

impl Scribe {
    /// Assemble a client over an already opened ledger.
    pub fn new(config: ScribeConfig, ledger: Arc<dyn LedgerClient>) -> Self {
        let identity = Arc::new(SessionIdentity::new());
        let store = Arc::new(RecordStore::new(
            ledger,
            identity.clone(),
            Arc::new(DigestCipher::from_config(&config.cipher)),
            StoreLayout::from(&config.ledger),
        ));
        let bus = OperationBus::new(EVENT_CAPACITY);
        let tracker = OperationTracker::with_sink(
            DisplayTimeouts::from(&config.operations),
            Arc::new(bus.clone()),
        );
        let analyzer = Arc::new(RecommendationAnalyzer::from_config(&config.analysis));
        let desk = Arc::new(SampleDesk::new(store, identity.clone(), analyzer, tracker));
        info!(
            "scribe client ready (index_key={}, record_prefix={})",
            config.ledger.index_key, config.ledger.record_prefix
        );
        Self {
            config,
            identity,
            bus,
            desk,
        }
    }

    /// Validate `config`, open its ledger and assemble a client.
    pub fn open(config: ScribeConfig, base: &Path) -> Result<Self, ScribeError> {
        config.validate()?;
        let ledger = open_ledger(&config.ledger, base)?;
        Ok(Self::new(config, ledger))
    }

    pub fn config(&self) -> &ScribeConfig {
        &self.config
    }

    /// Session whose connected account signs writes.
    pub fn identity(&self) -> &Arc<SessionIdentity> {
        &self.identity
    }

    pub fn desk(&self) -> &Arc<SampleDesk> {
        &self.desk
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        self.desk.store()
    }

    /// Receive every operation state change.
    pub fn subscribe(&self) -> broadcast::Receiver<OperationEvent> {
        self.bus.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scribe_rs_core::SampleDraft;
    use scribe_rs_protocol::{Category, OperationStatus};
    use tempfile::tempdir;

    fn memory_config() -> ScribeConfig {
        ScribeConfig::builder()
            .ledger(LedgerConfig {
                backend: LedgerBackend::Memory,
                ..LedgerConfig::default()
            })
            .build()
    }

    #[tokio::test]
    async fn submits_through_the_assembled_desk() {
        let temp = tempdir().expect("tempdir");
        let scribe = Scribe::open(memory_config(), temp.path()).expect("open");
        let mut events = scribe.subscribe();
        scribe.identity().connect("0xabc");

        let record = scribe
            .desk()
            .submit(SampleDraft::new("alice", Category::Low, "sample text"))
            .await
            .expect("submit");
        assert!(record.payload.starts_with("FHE-WRITING-"));
        assert_eq!(scribe.store().list_all().await.expect("list"), vec![record]);

        let first = events.recv().await.expect("event");
        assert_eq!(first.state.status(), Some(OperationStatus::Pending));
    }

    #[tokio::test]
    async fn file_backend_defaults_under_base_dir() {
        let temp = tempdir().expect("tempdir");
        let config = ScribeConfig::builder()
            .ledger(LedgerConfig {
                deadline_ms: Some(500),
                ..LedgerConfig::default()
            })
            .build();
        let ledger = open_ledger(&config.ledger, temp.path()).expect("ledger");
        ledger.write("k", b"v").await.expect("write");
        assert!(temp.path().join(DEFAULT_LEDGER_DIR).is_dir());
        assert_eq!(ledger.read("k").await.expect("read"), Some(b"v".to_vec()));
    }

    #[test]
    fn open_rejects_invalid_config() {
        let temp = tempdir().expect("tempdir");
        let mut config = memory_config();
        config.ledger.index_key = String::new();
        assert!(matches!(
            Scribe::open(config, temp.path()),
            Err(ScribeError::Config(_))
        ));
    }
}
