//! Analysis of encrypted samples.

use async_trait::async_trait;
use log::debug;
use rand::seq::IndexedRandom;
use scribe_rs_config::AnalysisConfig;
use scribe_rs_protocol::Record;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("no recommendations configured")]
    NoRecommendations,
    #[error("{0}")]
    Failed(String),
}

/// Produces a result for a pending record without decrypting its payload.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, record: &Record) -> Result<String, AnalysisError>;
}

/// Picks one configured recommendation after a simulated compute delay.
#[derive(Debug, Clone)]
pub struct RecommendationAnalyzer {
    recommendations: Vec<String>,
    latency: Duration,
}

impl RecommendationAnalyzer {
    pub fn new(recommendations: Vec<String>, latency: Duration) -> Self {
        Self {
            recommendations,
            latency,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(
            config.recommendations.clone(),
            Duration::from_millis(config.simulated_latency_ms),
        )
    }

    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }
}

#[async_trait]
impl Analyzer for RecommendationAnalyzer {
    async fn analyze(&self, record: &Record) -> Result<String, AnalysisError> {
        debug!(
            "analyzing record (id={}, latency_ms={})",
            record.id,
            self.latency.as_millis()
        );
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.recommendations
            .choose(&mut rand::rng())
            .cloned()
            .ok_or(AnalysisError::NoRecommendations)
    }
}
