//! Shared domain types for Scribe: records, transitions and operation events.

mod operation;
mod record;

pub use operation::{
    Operation, OperationEvent, OperationKind, OperationSink, OperationState, OperationStatus,
};
pub use record::{Category, ParseCategoryError, Record, RecordId, RecordStatus, Transition};

/// Account string supplied by the identity provider.
pub type AccountId = String;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn record_serializes_with_camel_case_fields() {
        let record = Record::pending(
            RecordId::new("1700000000000-abc"),
            "FHE-WRITING-xyz",
            1_700_000_000,
            "alice",
            Category::Medium,
        );
        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(
            value,
            json!({
                "id": "1700000000000-abc",
                "payload": "FHE-WRITING-xyz",
                "createdAt": 1_700_000_000,
                "ownerId": "alice",
                "category": "medium",
                "status": "pending"
            })
        );
    }

    #[test]
    fn operation_state_round_trips_through_json() {
        let state = OperationState::Active(Operation {
            seq: 3,
            kind: OperationKind::Analyze,
            status: OperationStatus::Error,
            message: "Analysis failed".to_string(),
            updated_at: chrono::Utc::now(),
        });
        let encoded = serde_json::to_value(&state).expect("serialize");
        let decoded: OperationState = serde_json::from_value(encoded).expect("deserialize");
        assert_eq!(decoded, state);
        assert_eq!(decoded.status(), Some(OperationStatus::Error));
    }
}
