use serde_json::Value;

use super::{CodecError, ContentKind};

pub(super) fn encode(value: &Value) -> Result<String, CodecError> {
    if value.is_null() {
        return Ok("{}".to_string());
    }
    serde_json::to_string(value).map_err(|e| CodecError::Encode {
        kind: ContentKind::Json,
        reason: e.to_string(),
    })
}

/// Only objects and arrays are accepted as request bodies.
pub(super) fn decode(body: &[u8]) -> Result<Value, CodecError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| CodecError::Decode {
        kind: ContentKind::Json,
        reason: e.to_string(),
    })?;
    match value {
        Value::Object(_) | Value::Array(_) => Ok(value),
        _ => Err(CodecError::Decode {
            kind: ContentKind::Json,
            reason: "expected an object or an array".to_string(),
        }),
    }
}
