//! Event-bus bridge adapter
//!
//! Implements the transport port over a WebSocket bridge connection.

pub mod connection;
pub mod frame;

pub use connection::{DEFAULT_PING_INTERVAL, WebSocketConnection, WebSocketConnector};
pub use frame::{BridgeFrame, websocket_url};
