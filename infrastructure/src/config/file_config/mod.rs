//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.

mod gateway;
mod logging;
mod output;

pub use gateway::FileGatewayConfig;
pub use logging::FileLoggingConfig;
pub use output::{FileOutputConfig, FileOutputFormat};

use busgate_domain::ClientIdentity;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from validating a loaded configuration
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("gateway.endpoint must start with http://, https://, ws:// or wss:// (got '{0}')")]
    InvalidEndpoint(String),

    #[error("gateway.client_id cannot be empty")]
    EmptyClientId,

    #[error("gateway.ping_interval_secs cannot be 0")]
    InvalidPingInterval,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Event-bus connection settings
    pub gateway: FileGatewayConfig,
    /// Output settings
    pub output: FileOutputConfig,
    /// Log and diagnostics files
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let endpoint = self.gateway.endpoint.trim();
        if !["http://", "https://", "ws://", "wss://"]
            .iter()
            .any(|scheme| endpoint.starts_with(scheme))
        {
            return Err(ConfigValidationError::InvalidEndpoint(endpoint.to_string()));
        }

        if let Some(id) = &self.gateway.client_id
            && ClientIdentity::new(id.as_str()).is_err()
        {
            return Err(ConfigValidationError::EmptyClientId);
        }

        if self.gateway.ping_interval_secs == 0 {
            return Err(ConfigValidationError::InvalidPingInterval);
        }

        Ok(())
    }
}
