use async_trait::async_trait;
use scribe_rs_core::{AnalysisError, Analyzer};
use scribe_rs_protocol::Record;
use std::sync::Arc;
use tokio::sync::Notify;

/// Analyzer that returns the same result immediately.
#[derive(Debug, Clone)]
pub struct FixedAnalyzer {
    result: String,
}

impl FixedAnalyzer {
    pub fn new(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
        }
    }
}

#[async_trait]
impl Analyzer for FixedAnalyzer {
    async fn analyze(&self, _record: &Record) -> Result<String, AnalysisError> {
        Ok(self.result.clone())
    }
}

#[derive(Debug, Clone)]
pub struct FailingAnalyzer {
    reason: String,
}

impl FailingAnalyzer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Analyzer for FailingAnalyzer {
    async fn analyze(&self, _record: &Record) -> Result<String, AnalysisError> {
        Err(AnalysisError::Failed(self.reason.clone()))
    }
}

/// Analyzer that blocks until `release` is called, then returns its outcome.
#[derive(Clone)]
pub struct GatedAnalyzer {
    outcome: Result<String, String>,
    started: Arc<Notify>,
    gate: Arc<Notify>,
}

impl GatedAnalyzer {
    pub fn new(result: impl Into<String>) -> Self {
        Self::with_outcome(Ok(result.into()))
    }

    /// Gated analyzer that fails with `reason` once released.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self::with_outcome(Err(reason.into()))
    }

    fn with_outcome(outcome: Result<String, String>) -> Self {
        Self {
            outcome,
            started: Arc::new(Notify::new()),
            gate: Arc::new(Notify::new()),
        }
    }

    /// Resolves once an analysis has entered the gate.
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl Analyzer for GatedAnalyzer {
    async fn analyze(&self, _record: &Record) -> Result<String, AnalysisError> {
        self.started.notify_one();
        self.gate.notified().await;
        self.outcome.clone().map_err(AnalysisError::Failed)
    }
}
