//! Writing-sample record model shared by the store, codec and presentation.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Length of the random component appended to generated ids.
const RANDOM_SUFFIX_LEN: usize = 9;

/// Opaque, client-generated record identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh id from the current wall clock plus a random suffix.
    pub fn generate() -> Self {
        Self::generate_at(Utc::now().timestamp_millis())
    }

    /// Generate an id for the given millisecond timestamp.
    ///
    /// The timestamp keeps ids roughly time ordered; the random suffix makes
    /// two ids minted in the same millisecond distinct.
    pub fn generate_at(millis: i64) -> Self {
        let random = Uuid::new_v4().simple().to_string();
        let suffix = &random[..RANDOM_SUFFIX_LEN];
        Self(format!("{millis}-{suffix}"))
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Difficulty bucket assigned to a sample at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[serde(alias = "easy")]
    Low,
    Medium,
    #[serde(alias = "hard")]
    High,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Category; 3] = [Category::Low, Category::Medium, Category::High];

    /// Wire name of the category.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Low => "low",
            Category::Medium => "medium",
            Category::High => "high",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown category name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct ParseCategoryError(pub String);

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" | "easy" => Ok(Category::Low),
            "medium" => Ok(Category::Medium),
            "high" | "hard" => Ok(Category::High),
            other => Err(ParseCategoryError(other.to_string())),
        }
    }
}

/// Processing status of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Pending,
    #[serde(alias = "analyzed")]
    Completed,
    #[serde(alias = "error")]
    Failed,
}

impl RecordStatus {
    /// Every status, in display order.
    pub const ALL: [RecordStatus; 3] = [
        RecordStatus::Pending,
        RecordStatus::Completed,
        RecordStatus::Failed,
    ];

    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(self) -> bool {
        !matches!(self, RecordStatus::Pending)
    }

    /// Wire name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Completed => "completed",
            RecordStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single writing sample as materialized from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Unique id; also forms the record's ledger key.
    pub id: RecordId,
    /// Encrypted payload token. Never decrypted on the client.
    pub payload: String,
    /// Creation time in seconds since the epoch.
    pub created_at: i64,
    /// Subject the sample concerns.
    pub owner_id: String,
    pub category: Category,
    pub status: RecordStatus,
    /// Analysis result, present only once completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl Record {
    /// Build a freshly created, pending record.
    pub fn pending(
        id: RecordId,
        payload: impl Into<String>,
        created_at: i64,
        owner_id: impl Into<String>,
        category: Category,
    ) -> Self {
        Self {
            id,
            payload: payload.into(),
            created_at,
            owner_id: owner_id.into(),
            category,
            status: RecordStatus::Pending,
            result: None,
        }
    }

    /// Return a copy of this record with the transition applied.
    ///
    /// Returns `None` when the record is already terminal.
    pub fn transitioned(&self, transition: &Transition) -> Option<Record> {
        if self.status.is_terminal() {
            return None;
        }
        let mut next = self.clone();
        next.status = transition.status();
        next.result = transition.result().map(str::to_string);
        Some(next)
    }
}

/// A one-shot move out of `pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Mark the record completed with an attached result.
    Complete(String),
    /// Mark the record failed.
    Fail,
}

impl Transition {
    /// Target status of the transition.
    pub fn status(&self) -> RecordStatus {
        match self {
            Transition::Complete(_) => RecordStatus::Completed,
            Transition::Fail => RecordStatus::Failed,
        }
    }

    /// Result attached by the transition, if any.
    pub fn result(&self) -> Option<&str> {
        match self {
            Transition::Complete(result) => Some(result.as_str()),
            Transition::Fail => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn generated_ids_embed_timestamp_and_differ() {
        let a = RecordId::generate_at(1_700_000_000_000);
        let b = RecordId::generate_at(1_700_000_000_000);
        assert!(a.as_str().starts_with("1700000000000-"));
        assert_eq!(a.as_str().len(), "1700000000000-".len() + RANDOM_SUFFIX_LEN);
        assert_ne!(a, b);
    }

    #[test]
    fn category_parses_legacy_names() {
        assert_eq!("easy".parse::<Category>(), Ok(Category::Low));
        assert_eq!("HARD".parse::<Category>(), Ok(Category::High));
        assert_eq!("medium".parse::<Category>(), Ok(Category::Medium));
        assert!("extreme".parse::<Category>().is_err());
    }

    #[test]
    fn terminal_records_refuse_transitions() {
        let record = Record::pending(RecordId::new("a"), "tok", 1, "alice", Category::Low);
        let done = record
            .transitioned(&Transition::Complete("ok".to_string()))
            .expect("pending record transitions");
        assert_eq!(done.status, RecordStatus::Completed);
        assert_eq!(done.result.as_deref(), Some("ok"));
        assert_eq!(done.transitioned(&Transition::Fail), None);
    }

    #[test]
    fn status_accepts_legacy_wire_names() {
        let status: RecordStatus = serde_json::from_str("\"analyzed\"").expect("status");
        assert_eq!(status, RecordStatus::Completed);
        let status: RecordStatus = serde_json::from_str("\"error\"").expect("status");
        assert_eq!(status, RecordStatus::Failed);
    }
}
