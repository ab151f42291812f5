//! Domain layer for busgate
//!
//! This crate contains the protocol vocabulary: catalogs, identities, channel
//! names, lifecycle state and the wire envelope. It has no dependencies on
//! infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Channels
//!
//! One transport connection carries several named channels. Each client gets
//! a dedicated pair (server → client, client → server) derived from its
//! identity, plus a fixed handshake channel shared by everyone.
//!
//! ## Events and Queries
//!
//! - **Events**: server-pushed, fire-and-forget, fanned out to subscribers
//! - **Queries**: request/response, matched by a correlation id

pub mod catalog;
pub mod connection;
pub mod core;
pub mod message;

// Re-export commonly used types
pub use catalog::{event::Event, query::Query};
pub use connection::{
    channels::{ChannelPair, INBOUND_PREFIX, OUTBOUND_PREFIX},
    identity::ClientIdentity,
    state::GatewayState,
};
pub use core::error::DomainError;
pub use message::{
    correlation::{
        REQUEST_ID_FIELD, RequestId, attach_request_id, peek_request_id, strip_request_id,
    },
    envelope::{ERROR_TYPE, SUBSCRIBE_TYPE, WireMessage},
};
