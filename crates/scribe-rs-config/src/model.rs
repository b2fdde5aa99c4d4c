//! Configuration schema for Scribe.

use serde::{Deserialize, Serialize};

/// Root config for the Scribe client.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ScribeConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub operations: OperationsConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub cipher: CipherConfig,
}

impl ScribeConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> ScribeConfigBuilder {
        ScribeConfigBuilder::new()
    }
}

/// Builder for assembling a `ScribeConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct ScribeConfigBuilder {
    config: ScribeConfig,
}

impl ScribeConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: ScribeConfig::default(),
        }
    }

    /// Replace the ledger configuration.
    pub fn ledger(mut self, ledger: LedgerConfig) -> Self {
        self.config.ledger = ledger;
        self
    }

    /// Replace the operation display configuration.
    pub fn operations(mut self, operations: OperationsConfig) -> Self {
        self.config.operations = operations;
        self
    }

    /// Replace the analysis configuration.
    pub fn analysis(mut self, analysis: AnalysisConfig) -> Self {
        self.config.analysis = analysis;
        self
    }

    /// Replace the payload cipher configuration.
    pub fn cipher(mut self, cipher: CipherConfig) -> Self {
        self.config.cipher = cipher;
        self
    }

    /// Finalize and return the built `ScribeConfig`.
    pub fn build(self) -> ScribeConfig {
        self.config
    }
}

/// Ledger backend selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    /// In-process map; contents vanish with the process.
    Memory,
    /// One file per key under `path`.
    #[default]
    File,
}

/// Ledger connection and key layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerConfig {
    #[serde(default)]
    pub backend: LedgerBackend,
    /// Root directory for the file backend.
    #[serde(default)]
    pub path: Option<String>,
    /// Reserved key holding the serialized index.
    #[serde(default = "default_index_key")]
    pub index_key: String,
    /// Prefix prepended to record ids to form their keys.
    #[serde(default = "default_record_prefix")]
    pub record_prefix: String,
    /// Optional deadline applied to every ledger call.
    #[serde(default)]
    pub deadline_ms: Option<u64>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::default(),
            path: None,
            index_key: default_index_key(),
            record_prefix: default_record_prefix(),
            deadline_ms: None,
        }
    }
}

/// Default reserved index key.
fn default_index_key() -> String {
    "sample_keys".to_string()
}

/// Default record key prefix.
fn default_record_prefix() -> String {
    "sample_".to_string()
}

/// How long terminal operation statuses stay on screen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationsConfig {
    #[serde(default = "default_success_display_ms")]
    pub success_display_ms: u64,
    #[serde(default = "default_error_display_ms")]
    pub error_display_ms: u64,
}

impl Default for OperationsConfig {
    fn default() -> Self {
        Self {
            success_display_ms: default_success_display_ms(),
            error_display_ms: default_error_display_ms(),
        }
    }
}

fn default_success_display_ms() -> u64 {
    2000
}

fn default_error_display_ms() -> u64 {
    3000
}

/// Settings for the encrypted-sample analysis step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    /// Artificial latency standing in for encrypted computation.
    #[serde(default = "default_simulated_latency_ms")]
    pub simulated_latency_ms: u64,
    /// Candidate recommendations produced by analysis.
    #[serde(default = "default_recommendations")]
    pub recommendations: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            simulated_latency_ms: default_simulated_latency_ms(),
            recommendations: default_recommendations(),
        }
    }
}

fn default_simulated_latency_ms() -> u64 {
    3000
}

/// Built-in handwriting recommendations.
fn default_recommendations() -> Vec<String> {
    [
        "Focus on letter spacing consistency",
        "Try larger writing to improve legibility",
        "Practice curved strokes for better letter formation",
        "Use guided writing exercises for letter size consistency",
        "Try different grip techniques to reduce pressure",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

/// Payload cipher settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CipherConfig {
    /// Prefix marking ciphertext tokens.
    #[serde(default = "default_token_prefix")]
    pub token_prefix: String,
}

impl Default for CipherConfig {
    fn default() -> Self {
        Self {
            token_prefix: default_token_prefix(),
        }
    }
}

fn default_token_prefix() -> String {
    "FHE-WRITING-".to_string()
}
