//! Application configuration
//!
//! - [`GatewayConfig`] - where the gateway connects and how long callers wait

mod gateway_config;

pub use gateway_config::{DEFAULT_ENDPOINT, GatewayConfig};
