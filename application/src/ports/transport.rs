//! Event-bus transport port
//!
//! Defines the connection abstraction the gateway core is written against.
//! A connection carries many named addresses (channels); the core registers a
//! handler on one of them and sends on others. Implementations (adapters)
//! live in the infrastructure layer.

use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised synchronously by a transport operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("No async runtime available to drive the connection")]
    NoRuntime,

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Transport closed")]
    Closed,
}

/// A delivery the transport could not complete (reported per message).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Delivery error on {address}: {message}")]
pub struct DeliveryError {
    pub address: String,
    pub message: String,
}

impl DeliveryError {
    pub fn new(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            message: message.into(),
        }
    }
}

/// A message delivered on a registered address.
///
/// Mirrors the bridge envelope `{type, address, body}`; the gateway reads
/// only `body`.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundFrame {
    pub address: String,
    pub body: Value,
}

impl InboundFrame {
    pub fn new(address: impl Into<String>, body: Value) -> Self {
        Self {
            address: address.into(),
            body,
        }
    }
}

/// Called once when the connection opens.
pub type OpenHandler = Box<dyn FnOnce() + Send>;

/// Called for every delivery on a registered address.
pub type MessageHandler = Arc<dyn Fn(Result<InboundFrame, DeliveryError>) + Send + Sync>;

/// Opens connections to an event bus endpoint.
pub trait EventBusConnector: Send + Sync {
    /// Start opening a connection to `endpoint`.
    ///
    /// Returns immediately; the connection announces readiness through
    /// [`EventBusConnection::on_open`].
    fn open(&self, endpoint: &str) -> Result<Arc<dyn EventBusConnection>, TransportError>;
}

/// One live connection to the event bus.
pub trait EventBusConnection: Send + Sync {
    /// Register the open notification. Fires immediately when the connection
    /// is already open.
    fn on_open(&self, handler: OpenHandler);

    /// Deliver every message arriving on `address` to `handler`.
    fn register_handler(&self, address: &str, handler: MessageHandler)
    -> Result<(), TransportError>;

    /// Send a serialized payload to `address`.
    fn send(&self, address: &str, payload: String) -> Result<(), TransportError>;
}
