//! Infrastructure layer for busgate
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod eventbus;
pub mod logging;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileConfig, FileGatewayConfig, FileLoggingConfig,
    FileOutputConfig, FileOutputFormat,
};
pub use eventbus::{WebSocketConnection, WebSocketConnector};
pub use logging::JsonlDiagnosticSink;
