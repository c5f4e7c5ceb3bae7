// Codec - text encoding of the expense list
//
// Current layout (version 1):
//   {"version": 1, "items": [{"id": ..., "name": ..., "category": ..., "amount": ...}]}
//
// Legacy layout (no version): a bare array of records using "type" for the
// category. It is still readable; the next write upgrades it.

use crate::record::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

/// Version written by `encode`
pub const FORMAT_VERSION: u64 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u64,
    items: &'a [Record],
}

#[derive(Deserialize)]
struct Envelope {
    items: Vec<Record>,
}

/// Why a stored blob could not be turned back into records
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed expense data: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("expense data is neither an object nor an array")]
    UnexpectedShape,
    #[error("expense data has no version field")]
    MissingVersion,
    #[error("unsupported expense data version {0}")]
    UnsupportedVersion(u64),
    #[error("duplicate record id {0}")]
    DuplicateId(Uuid),
}

/// Encode the full record sequence into the current layout
pub fn encode(records: &[Record]) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&EnvelopeRef {
        version: FORMAT_VERSION,
        items: records,
    })
}

/// Decode a stored blob, accepting both the current and the legacy layout
pub fn decode(bytes: &[u8]) -> Result<Vec<Record>, DecodeError> {
    let value: Value = serde_json::from_slice(bytes)?;

    let records = match value {
        Value::Array(_) => serde_json::from_value::<Vec<Record>>(value)?,
        Value::Object(ref map) => {
            let version = map
                .get("version")
                .and_then(Value::as_u64)
                .ok_or(DecodeError::MissingVersion)?;
            if version != FORMAT_VERSION {
                return Err(DecodeError::UnsupportedVersion(version));
            }
            serde_json::from_value::<Envelope>(value)?.items
        }
        _ => return Err(DecodeError::UnexpectedShape),
    };

    let mut seen = HashSet::with_capacity(records.len());
    for record in &records {
        if !seen.insert(record.id) {
            return Err(DecodeError::DuplicateId(record.id));
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_writes_version() {
        let records = vec![Record::new("Coffee", "Personal", 5)];
        let value: Value = serde_json::from_slice(&encode(&records).unwrap()).unwrap();

        assert_eq!(value["version"], 1);
        assert_eq!(value["items"][0]["name"], "Coffee");
    }

    #[test]
    fn test_decode_preserves_order() {
        let records = vec![
            Record::new("Coffee", "Personal", 5),
            Record::new("Laptop", "Business", 1200),
            Record::new("Refund", "Business", -40),
        ];

        let decoded = decode(&encode(&records).unwrap()).unwrap();

        assert_eq!(decoded, records);
    }

    #[test]
    fn test_decode_legacy_array() {
        let blob = br#"[
            {"id":"0b7e4f6a-58f1-4c9b-9d3e-2a1f0e9c8b7a","name":"Lunch","type":"Personal","amount":12},
            {"id":"a3d5c7e9-1b2f-4a6c-8e0d-9f7b5a3c1e2d","name":"Train","type":"Business","amount":45}
        ]"#;

        let decoded = decode(blob).unwrap();

        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].name, "Lunch");
        assert_eq!(decoded[1].category, "Business");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode(b"not json"), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode(b""), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode(b"42"), Err(DecodeError::UnexpectedShape)));
    }

    #[test]
    fn test_decode_rejects_unknown_version() {
        let blob = br#"{"version": 7, "items": []}"#;
        assert!(matches!(decode(blob), Err(DecodeError::UnsupportedVersion(7))));

        let blob = br#"{"items": []}"#;
        assert!(matches!(decode(blob), Err(DecodeError::MissingVersion)));
    }

    #[test]
    fn test_decode_rejects_missing_field() {
        let blob = br#"{"version": 1, "items": [{"id":"0b7e4f6a-58f1-4c9b-9d3e-2a1f0e9c8b7a","name":"Lunch","amount":12}]}"#;

        assert!(matches!(decode(blob), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_decode_rejects_duplicate_ids() {
        let record = Record::new("Coffee", "Personal", 5);
        let blob = encode(&[record.clone(), record.clone()]).unwrap();

        match decode(&blob) {
            Err(DecodeError::DuplicateId(id)) => assert_eq!(id, record.id),
            other => panic!("expected duplicate id error, got {:?}", other),
        }
    }
}
