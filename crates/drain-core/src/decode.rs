use drain_model::{Job, JobKind, Payload};
use serde_json::{Map, Value};

use crate::error::DecodeError;

const KIND_FIELD: &str = "type";
const DATA_FIELD: &str = "data";

/// Turns a raw queue item into an unsequenced [`Job`].
///
/// The wire format is a UTF-8 JSON object `{"type": <string>, "data": <object>}`.
/// A missing, null, blank or non-string `type` yields [`JobKind::unknown`]; a
/// missing or null `data` yields an empty payload. Extra top-level fields are
/// ignored. Pure: the same bytes always decode to the same job.
pub fn decode(raw: &[u8]) -> Result<Job, DecodeError> {
    let text = std::str::from_utf8(raw)?;
    let value: Value = serde_json::from_str(text)?;

    let Value::Object(mut object) = value else {
        return Err(DecodeError::NotAnObject(json_type(&value)));
    };

    let kind = match object.remove(KIND_FIELD) {
        Some(Value::String(kind)) if !kind.trim().is_empty() => JobKind::from(kind),
        _ => JobKind::unknown(),
    };
    let payload: Payload = match object.remove(DATA_FIELD) {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(data)) => data,
        Some(other) => return Err(DecodeError::DataNotAnObject(json_type(&other))),
    };

    Ok(Job::new(kind, payload))
}

/// Serialises a job into the wire format understood by [`decode`].
///
/// Only producers (seeders, tests) need this; the sequence id is not carried.
pub fn encode(job: &Job) -> Vec<u8> {
    let mut object = Map::with_capacity(2);
    object.insert(KIND_FIELD.into(), Value::String(job.kind().to_string()));
    object.insert(DATA_FIELD.into(), Value::Object(job.payload().clone()));
    Value::Object(object).to_string().into_bytes()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_typed_payload() {
        let job = decode(br#"{"type":"email","data":{"to":"a@b.com"}}"#).unwrap();
        assert_eq!(job.kind().as_str(), "email");
        assert_eq!(job.field("to"), Some(&json!("a@b.com")));
        assert_eq!(job.sequence_id(), 0);
    }

    #[test]
    fn missing_or_odd_type_falls_back_to_unknown() {
        let cases: [&[u8]; 4] = [
            br#"{"data":{}}"#,
            br#"{"type":null}"#,
            br#"{"type":42,"data":{}}"#,
            br#"{"type":"   "}"#,
        ];
        for raw in cases {
            let job = decode(raw).unwrap();
            assert!(job.kind().is_unknown(), "{}", String::from_utf8_lossy(raw));
            assert!(job.payload().is_empty());
        }
    }

    #[test]
    fn decode_is_idempotent() {
        let raw = br#"{"type":"slow_task","data":{"duration":2.0,"task_id":"slow_1"}}"#;
        assert_eq!(decode(raw).unwrap(), decode(raw).unwrap());
    }

    #[test]
    fn rejects_invalid_text() {
        assert!(matches!(decode(b"not json"), Err(DecodeError::Syntax(_))));
        assert!(matches!(decode(&[0xff, 0xfe, 0x7b]), Err(DecodeError::Utf8(_))));
    }

    #[test]
    fn rejects_non_object_documents() {
        assert!(matches!(decode(b"[1,2,3]"), Err(DecodeError::NotAnObject("array"))));
        assert!(matches!(decode(b"\"email\""), Err(DecodeError::NotAnObject("string"))));
        assert!(matches!(
            decode(br#"{"type":"email","data":[1]}"#),
            Err(DecodeError::DataNotAnObject("array"))
        ));
    }

    #[test]
    fn encode_is_understood_by_decode() {
        let job = decode(br#"{"type":"file_process","data":{"path":"/tmp/x"}}"#).unwrap();
        let again = decode(&encode(&job)).unwrap();
        assert_eq!(again, job);
    }
}
