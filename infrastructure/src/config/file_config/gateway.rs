//! Gateway configuration from TOML (`[gateway]` section)

use busgate_application::{DEFAULT_ENDPOINT, GatewayConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw gateway configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGatewayConfig {
    /// Event-bus bridge URL (`http(s)://` or `ws(s)://`)
    pub endpoint: String,
    /// Client identity used when `--client-id` is not given
    pub client_id: Option<String>,
    /// How long the CLI waits for a query response (0 = forever)
    pub query_timeout_secs: u64,
    /// Keep-alive ping interval of the bridge connection
    pub ping_interval_secs: u64,
}

impl Default for FileGatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            client_id: None,
            query_timeout_secs: 30,
            ping_interval_secs: 5,
        }
    }
}

impl FileGatewayConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    /// Build the application-layer config
    pub fn to_gateway_config(&self) -> GatewayConfig {
        GatewayConfig::default()
            .with_endpoint(self.endpoint.clone())
            .with_query_timeout_secs(self.query_timeout_secs)
    }
}
