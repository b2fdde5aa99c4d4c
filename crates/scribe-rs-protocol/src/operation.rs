//! Ephemeral, user-visible operation status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of long-running user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Submitting a new sample.
    Create,
    /// Analyzing an existing sample.
    Analyze,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Create => f.write_str("create"),
            OperationKind::Analyze => f.write_str("analyze"),
        }
    }
}

/// Status of the displayed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Pending,
    Success,
    Error,
}

impl OperationStatus {
    /// Success and Error are terminal and subject to auto-reset.
    pub fn is_terminal(self) -> bool {
        !matches!(self, OperationStatus::Pending)
    }
}

/// The operation currently shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Monotonic sequence number; bumps on every `begin`.
    pub seq: u64,
    pub kind: OperationKind,
    pub status: OperationStatus,
    /// Human-readable status line.
    pub message: String,
    /// When the operation last changed status.
    pub updated_at: DateTime<Utc>,
}

/// Single-slot operation state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "operation")]
pub enum OperationState {
    #[default]
    Idle,
    Active(Operation),
}

impl OperationState {
    /// Displayed operation, if any.
    pub fn operation(&self) -> Option<&Operation> {
        match self {
            OperationState::Idle => None,
            OperationState::Active(operation) => Some(operation),
        }
    }

    /// Status of the displayed operation, if any.
    pub fn status(&self) -> Option<OperationStatus> {
        self.operation().map(|operation| operation.status)
    }

    /// Message of the displayed operation, if any.
    pub fn message(&self) -> Option<&str> {
        self.operation().map(|operation| operation.message.as_str())
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, OperationState::Idle)
    }
}

/// Event emitted whenever the operation state changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationEvent {
    /// State after the change.
    pub state: OperationState,
    pub emitted_at: DateTime<Utc>,
}

impl OperationEvent {
    /// Build an event stamped with the current time.
    pub fn now(state: OperationState) -> Self {
        Self {
            state,
            emitted_at: Utc::now(),
        }
    }
}

/// Sink for operation events.
pub trait OperationSink: Send + Sync {
    /// Emit an event to downstream listeners.
    fn emit(&self, event: OperationEvent);
}
