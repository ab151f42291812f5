//! Gateway connection parameters.
//!
//! [`GatewayConfig`] holds what the gateway needs to reach the event bus.
//! Loaded from file configuration in the infrastructure layer and handed to
//! [`Gateway::new`](crate::gateway::Gateway::new) by the binary.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default event-bus bridge endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080/events";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Event-bus bridge URL passed to the connector on `init`.
    pub endpoint: String,
    /// Upper bound a caller waits for a query response.
    ///
    /// The gateway never expires pending queries itself; callers wrap
    /// `execute` with this when they need a deadline.
    pub query_timeout: Option<Duration>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            query_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl GatewayConfig {
    // ==================== Builder Methods ====================

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_query_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn with_query_timeout_secs(mut self, secs: u64) -> Self {
        self.query_timeout = if secs == 0 {
            None
        } else {
            Some(Duration::from_secs(secs))
        };
        self
    }
}
