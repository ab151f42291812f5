//! Gateway core
//!
//! Multiplexes one event-bus connection into pub/sub events and
//! request/response queries.
//!
//! - [`lifecycle`] - state machine, identity, ready callbacks
//! - [`registry`] - event subscriptions and at-most-once announcement
//! - [`correlator`] - pending queries keyed by correlation id
//! - [`dispatcher`] - classification of inbound deliveries
//! - [`facade`] - the [`Gateway`] handle tying them together

pub mod correlator;
pub mod dispatcher;
pub mod error;
pub mod facade;
pub mod lifecycle;
pub mod registry;

pub use error::GatewayError;
pub use facade::{Gateway, QueryFuture};
pub use registry::EventCallback;
