//! Inbound message classification.
//!
//! Every delivery on the inbound channel is sorted into exactly one
//! [`Inbound`] outcome. Classification is pure; the facade acts on the result
//! (resolving a query, fanning out to subscribers, reporting diagnostics).

use crate::ports::transport::{DeliveryError, InboundFrame};
use busgate_domain::{WireMessage, peek_request_id, strip_request_id};
use serde_json::Value;

/// What an inbound delivery turned out to be
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// The transport reported a failed delivery
    DeliveryFailed(DeliveryError),
    /// The body did not hold a `{type, data}` envelope
    Malformed { address: String, reason: String },
    /// `{"type": "error"}` from the server
    ServerError { address: String, data: Value },
    /// Response to a query; `data` has the correlation id removed
    Response { request_id: String, data: Value },
    /// Server-pushed event
    Event { wire_type: String, data: Value },
}

/// Sort one delivery.
///
/// Order matters: error messages win over correlation ids, and anything
/// carrying a correlation id is a response even if its type names an event.
pub fn classify(delivery: Result<InboundFrame, DeliveryError>) -> Inbound {
    let frame = match delivery {
        Ok(frame) => frame,
        Err(err) => return Inbound::DeliveryFailed(err),
    };

    let message = match WireMessage::from_body(&frame.body) {
        Ok(message) => message,
        Err(err) => {
            return Inbound::Malformed {
                address: frame.address,
                reason: err.to_string(),
            };
        }
    };

    if message.is_error() {
        return Inbound::ServerError {
            address: frame.address,
            data: message.data,
        };
    }

    if let Some(request_id) = peek_request_id(&message.data).map(str::to_string) {
        let mut data = message.data;
        strip_request_id(&mut data);
        return Inbound::Response { request_id, data };
    }

    Inbound::Event {
        wire_type: message.message_type,
        data: message.data,
    }
}
