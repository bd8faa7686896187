//! CBOR encoding of heartbeat bodies.

use ciborium::value::Value;
use thiserror::Error;

use super::message::{interpret_response, HeartbeatRequest, HeartbeatResponse};

/// Errors raised while converting heartbeat bodies to or from CBOR.
#[derive(Error, Debug)]
pub enum HeartbeatError {
    #[error("encoding failed: {0}")]
    Encode(String),

    #[error("decoding failed: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, HeartbeatError>;

/// Serialize a request as a CBOR map with text keys.
pub fn encode_request(request: &HeartbeatRequest) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(request, &mut buf).map_err(|e| HeartbeatError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Decode any CBOR body into a generic value.
pub fn decode_value(bytes: &[u8]) -> Result<Value> {
    ciborium::from_reader(bytes).map_err(|e| HeartbeatError::Decode(e.to_string()))
}

/// Decode a success body and read the heartbeat response fields from it.
///
/// The body must decode to a map; any other top-level value has no keys to
/// read and is reported as a decode failure.
pub fn decode_response(bytes: &[u8]) -> Result<HeartbeatResponse> {
    match decode_value(bytes)? {
        Value::Map(entries) => Ok(interpret_response(&entries)),
        other => Err(HeartbeatError::Decode(format!(
            "expected a map, got {}",
            value_kind(&other)
        ))),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Integer(_) => "integer",
        Value::Bytes(_) => "byte string",
        Value::Float(_) => "float",
        Value::Text(_) => "text",
        Value::Bool(_) => "bool",
        Value::Null => "null",
        Value::Tag(_, _) => "tagged value",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        _ => "unknown value",
    }
}
