//! Wire envelope `{"type": ..., "data": ...}`

use crate::catalog::event::Event;
use crate::connection::identity::ClientIdentity;
use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Message type of a network-level subscribe request.
pub const SUBSCRIBE_TYPE: &str = "subscribe";

/// Message type the server uses to report a failure.
pub const ERROR_TYPE: &str = "error";

/// The envelope carried in both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub data: Value,
}

impl WireMessage {
    pub fn new(message_type: impl Into<String>, data: Value) -> Self {
        Self {
            message_type: message_type.into(),
            data,
        }
    }

    /// `{type:"subscribe", data:{id:<wire event type>, clientId}}`
    pub fn subscribe(event: Event, client: &ClientIdentity) -> Self {
        Self::new(
            SUBSCRIBE_TYPE,
            json!({
                "id": event.wire_type(),
                "clientId": client.as_str(),
            }),
        )
    }

    /// Payload of the session handshake query
    pub fn handshake_payload(client: &ClientIdentity) -> Value {
        json!({ "id": client.as_str() })
    }

    /// Parse the envelope out of an inbound delivery body.
    ///
    /// The body is either the envelope object itself or JSON text holding it
    /// (bridges differ on whether they re-encode string bodies). Both `type`
    /// and `data` must be present; `type` must be a string.
    pub fn from_body(body: &Value) -> Result<Self, DomainError> {
        let parsed;
        let object = match body {
            Value::String(text) => {
                parsed = serde_json::from_str::<Value>(text)
                    .map_err(|e| DomainError::MalformedMessage(format!("body is not JSON: {}", e)))?;
                &parsed
            }
            other => other,
        };

        let message_type = object
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| DomainError::MalformedMessage("missing `type`".to_string()))?;
        let data = object
            .get("data")
            .ok_or_else(|| DomainError::MalformedMessage("missing `data`".to_string()))?;

        Ok(Self::new(message_type, data.clone()))
    }

    /// Server-reported error message
    pub fn is_error(&self) -> bool {
        self.message_type == ERROR_TYPE
    }

    /// Serialize to the JSON text handed to the transport
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
