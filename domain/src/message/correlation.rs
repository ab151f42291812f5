//! Correlation ids for query/response pairs

use crate::core::error::DomainError;
use serde_json::{Map, Value};

/// Reserved payload field carrying the correlation id.
///
/// Present on every query payload; the server echoes it on the response and
/// it is stripped before the response reaches the caller.
pub const REQUEST_ID_FIELD: &str = "requestIdentifier";

/// Correlation id of one in-flight query
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(String);

impl RequestId {
    /// Fresh random (v4) UUID
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Make sure `data` carries a correlation id and return it.
///
/// A caller-supplied string id is kept; otherwise a fresh one is inserted.
/// `null` is promoted to an empty object. Non-object payloads cannot carry
/// the field and are rejected.
pub fn attach_request_id(data: &mut Value) -> Result<RequestId, DomainError> {
    if data.is_null() {
        *data = Value::Object(Map::new());
    }
    let Value::Object(map) = data else {
        return Err(DomainError::MalformedMessage(
            "query payload must be a JSON object".to_string(),
        ));
    };

    if let Some(existing) = map.get(REQUEST_ID_FIELD).and_then(|v| v.as_str()) {
        return Ok(RequestId::from(existing));
    }

    let id = RequestId::generate();
    map.insert(
        REQUEST_ID_FIELD.to_string(),
        Value::String(id.as_str().to_string()),
    );
    Ok(id)
}

/// Read the correlation id without modifying the payload.
pub fn peek_request_id(data: &Value) -> Option<&str> {
    data.get(REQUEST_ID_FIELD).and_then(|v| v.as_str())
}

/// Remove the correlation id field from a response payload.
pub fn strip_request_id(data: &mut Value) {
    if let Value::Object(map) = data {
        map.remove(REQUEST_ID_FIELD);
    }
}
