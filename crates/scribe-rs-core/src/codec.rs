//! Byte encoding for records and the index blob.
//!
//! Records are stored as UTF-8 JSON objects with camelCase keys. Decoding is
//! strict about shape and types but accepts the legacy field and value names
//! that older clients wrote. The payload is never decrypted here.

use crate::cipher::{CipherError, EncryptionContext, PayloadCipher};
use scribe_rs_protocol::{Category, Record, RecordId, RecordStatus};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while encoding or decoding ledger bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Bytes are not a valid serialized document.
    #[error("malformed: {0}")]
    Malformed(String),
    /// Document parsed but fields are missing, ill-typed or inconsistent.
    #[error("schema violation: {0}")]
    SchemaViolation(String),
    #[error("encode failed: {0}")]
    Encode(String),
}

/// Stored shape of a record, including legacy spellings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    #[serde(default)]
    id: Option<RecordId>,
    #[serde(alias = "data")]
    payload: String,
    #[serde(alias = "timestamp")]
    created_at: i64,
    #[serde(alias = "studentId")]
    owner_id: String,
    #[serde(alias = "difficulty")]
    category: Category,
    /// Older clients wrote new records without a status.
    #[serde(default = "pending_status")]
    status: RecordStatus,
    #[serde(default, alias = "fheRecommendation")]
    result: Option<String>,
}

fn pending_status() -> RecordStatus {
    RecordStatus::Pending
}

/// Record and index codec plus the pluggable payload cipher.
#[derive(Clone)]
pub struct RecordCodec {
    cipher: Arc<dyn PayloadCipher>,
}

impl RecordCodec {
    pub fn new(cipher: Arc<dyn PayloadCipher>) -> Self {
        Self { cipher }
    }

    /// Serialize a record whose payload is already encrypted.
    pub fn encode(&self, record: &Record) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(record).map_err(|err| CodecError::Encode(err.to_string()))
    }

    /// Deserialize a record that must carry its own id.
    pub fn decode(&self, bytes: &[u8]) -> Result<Record, CodecError> {
        let stored = parse_stored(bytes)?;
        let Some(id) = stored.id.clone() else {
            return Err(CodecError::SchemaViolation("missing field `id`".to_string()));
        };
        finish(id, stored)
    }

    /// Deserialize a record read from the key derived from `expected`.
    ///
    /// A body without an id takes the expected one; a body whose id differs
    /// is rejected.
    pub fn decode_stored(&self, expected: &RecordId, bytes: &[u8]) -> Result<Record, CodecError> {
        let stored = parse_stored(bytes)?;
        match &stored.id {
            Some(id) if id != expected => Err(CodecError::SchemaViolation(format!(
                "id `{id}` does not match its key id `{expected}`"
            ))),
            _ => finish(expected.clone(), stored),
        }
    }

    /// Turn plaintext into an opaque ciphertext token.
    pub fn encrypt_payload(
        &self,
        plaintext: &str,
        context: &EncryptionContext,
    ) -> Result<String, CipherError> {
        self.cipher.encrypt(plaintext, context)
    }

    pub fn encode_index(&self, ids: &[RecordId]) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(ids).map_err(|err| CodecError::Encode(err.to_string()))
    }

    /// Decode the index blob: a JSON array of id strings.
    pub fn decode_index(&self, bytes: &[u8]) -> Result<Vec<RecordId>, CodecError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|err| CodecError::Malformed(err.to_string()))?;
        serde_json::from_value(value).map_err(|err| CodecError::SchemaViolation(err.to_string()))
    }
}

fn parse_stored(bytes: &[u8]) -> Result<StoredRecord, CodecError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|err| CodecError::Malformed(err.to_string()))?;
    if !value.is_object() {
        return Err(CodecError::SchemaViolation(
            "expected a JSON object".to_string(),
        ));
    }
    serde_json::from_value(value).map_err(|err| CodecError::SchemaViolation(err.to_string()))
}

/// Apply invariants serde cannot express.
fn finish(id: RecordId, stored: StoredRecord) -> Result<Record, CodecError> {
    if id.as_str().is_empty() {
        return Err(CodecError::SchemaViolation("empty id".to_string()));
    }
    match (stored.status, &stored.result) {
        (RecordStatus::Completed, None) => {
            return Err(CodecError::SchemaViolation(
                "completed record without a result".to_string(),
            ));
        }
        (RecordStatus::Pending | RecordStatus::Failed, Some(_)) => {
            return Err(CodecError::SchemaViolation(format!(
                "{} record carries a result",
                stored.status
            )));
        }
        _ => {}
    }
    Ok(Record {
        id,
        payload: stored.payload,
        created_at: stored.created_at,
        owner_id: stored.owner_id,
        category: stored.category,
        status: stored.status,
        result: stored.result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::DigestCipher;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn codec() -> RecordCodec {
        RecordCodec::new(Arc::new(DigestCipher::new("FHE-WRITING-")))
    }

    fn sample() -> Record {
        Record::pending(
            RecordId::new("1700000000000-abcdefghi"),
            "FHE-WRITING-token",
            1_700_000_000,
            "alice",
            Category::High,
        )
    }

    #[test]
    fn encode_then_decode_preserves_every_field() {
        let codec = codec();
        let mut record = sample();
        let bytes = codec.encode(&record).expect("encode");
        assert_eq!(codec.decode(&bytes).expect("decode"), record);

        record.status = RecordStatus::Completed;
        record.result = Some("suggestion A".to_string());
        let bytes = codec.encode(&record).expect("encode");
        assert_eq!(codec.decode(&bytes).expect("decode"), record);
    }

    #[test]
    fn invalid_bytes_are_malformed() {
        let err = codec().decode(b"{not json").unwrap_err();
        assert!(matches!(err, CodecError::Malformed(_)));
    }

    #[test]
    fn missing_or_ill_typed_fields_violate_schema() {
        let codec = codec();
        let missing = json!({ "id": "x", "payload": "p", "createdAt": 1, "ownerId": "a", "status": "pending" });
        let err = codec.decode(missing.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, CodecError::SchemaViolation(_)), "{err}");

        let ill_typed = json!({
            "id": "x", "payload": "p", "createdAt": "yesterday",
            "ownerId": "a", "category": "low", "status": "pending"
        });
        let err = codec.decode(ill_typed.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, CodecError::SchemaViolation(_)), "{err}");

        let err = codec.decode(b"[1, 2]").unwrap_err();
        assert!(matches!(err, CodecError::SchemaViolation(_)));
    }

    #[test]
    fn result_must_match_status() {
        let codec = codec();
        let completed = json!({
            "id": "x", "payload": "p", "createdAt": 1,
            "ownerId": "a", "category": "low", "status": "completed"
        });
        assert!(codec.decode(completed.to_string().as_bytes()).is_err());

        let pending = json!({
            "id": "x", "payload": "p", "createdAt": 1,
            "ownerId": "a", "category": "low", "status": "pending", "result": "early"
        });
        assert!(codec.decode(pending.to_string().as_bytes()).is_err());
    }

    #[test]
    fn legacy_body_decodes_against_its_key() {
        let legacy = json!({
            "data": "FHE-WRITING-abc",
            "timestamp": 1_690_000_000,
            "studentId": "student-7",
            "difficulty": "hard",
            "status": "analyzed",
            "fheRecommendation": "Focus on letter spacing consistency"
        });
        let expected = RecordId::new("1690000000000-legacy123");
        let record = codec()
            .decode_stored(&expected, legacy.to_string().as_bytes())
            .expect("decode legacy");
        assert_eq!(record.id, expected);
        assert_eq!(record.category, Category::High);
        assert_eq!(record.status, RecordStatus::Completed);
        assert_eq!(record.owner_id, "student-7");
        assert_eq!(
            record.result.as_deref(),
            Some("Focus on letter spacing consistency")
        );
    }

    #[test]
    fn legacy_body_without_status_is_pending() {
        let legacy = json!({
            "data": "FHE-WRITING-abc",
            "timestamp": 1_690_000_000,
            "studentId": "student-7",
            "difficulty": "easy"
        });
        let expected = RecordId::new("1690000000000-legacy456");
        let record = codec()
            .decode_stored(&expected, legacy.to_string().as_bytes())
            .expect("decode legacy");
        assert_eq!(record.status, RecordStatus::Pending);
        assert_eq!(record.category, Category::Low);
        assert_eq!(record.result, None);
    }

    #[test]
    fn stored_id_must_match_key() {
        let codec = codec();
        let bytes = codec.encode(&sample()).expect("encode");
        let err = codec
            .decode_stored(&RecordId::new("other"), &bytes)
            .unwrap_err();
        assert!(matches!(err, CodecError::SchemaViolation(_)));
    }

    #[test]
    fn index_blob_is_a_json_array() {
        let codec = codec();
        let ids = vec![RecordId::new("a"), RecordId::new("b")];
        let bytes = codec.encode_index(&ids).expect("encode");
        assert_eq!(bytes, br#"["a","b"]"#.to_vec());
        assert_eq!(codec.decode_index(&bytes).expect("decode"), ids);
        assert!(codec.decode_index(br#"{"a":1}"#).is_err());
    }
}
