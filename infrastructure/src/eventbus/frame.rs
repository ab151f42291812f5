//! Event-bus bridge framing.
//!
//! The bridge speaks JSON frames over a raw WebSocket, tagged by `type`:
//!
//! | Direction | `type` | Fields |
//! |-----------|--------|--------|
//! | client -> server | `register` | `address` |
//! | client -> server | `send` | `address`, `body` (JSON text) |
//! | client -> server | `ping` | |
//! | server -> client | `rec` | `address`, `body` |
//! | server -> client | `err` | `message`, optional `address` |
//! | server -> client | `pong` | |

use busgate_application::TransportError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Path suffix of the raw WebSocket endpoint under an HTTP bridge URL.
const WEBSOCKET_SUFFIX: &str = "/websocket";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BridgeFrame {
    Register {
        address: String,
    },
    Send {
        address: String,
        body: String,
    },
    Ping,
    Rec {
        address: String,
        body: Value,
    },
    Err {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        address: Option<String>,
        message: String,
    },
    Pong,
}

impl BridgeFrame {
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Turn a configured bridge endpoint into a WebSocket URL.
///
/// `http(s)://host/path` becomes `ws(s)://host/path/websocket`; `ws(s)://`
/// URLs are used as given.
pub fn websocket_url(endpoint: &str) -> Result<String, TransportError> {
    let endpoint = endpoint.trim();
    if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
        return Ok(endpoint.to_string());
    }

    let converted = if let Some(rest) = endpoint.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else if let Some(rest) = endpoint.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else {
        return Err(TransportError::InvalidEndpoint(endpoint.to_string()));
    };

    if converted.ends_with("://") {
        return Err(TransportError::InvalidEndpoint(endpoint.to_string()));
    }
    Ok(format!(
        "{}{}",
        converted.trim_end_matches('/'),
        WEBSOCKET_SUFFIX
    ))
}
