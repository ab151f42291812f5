//! Closed protocol catalogs.
//!
//! - [`event::Event`] - server-pushed event types, including the `ALL` wildcard
//! - [`query::Query`] - request/response query types
//!
//! Names outside these enums are rejected client-side, before anything
//! reaches the network.

pub mod event;
pub mod query;
