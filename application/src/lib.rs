//! Application layer for busgate
//!
//! This crate contains the gateway core, port definitions, and application
//! configuration. It depends only on the domain layer.

pub mod config;
pub mod gateway;
pub mod ports;

// Re-export commonly used types
pub use config::{DEFAULT_ENDPOINT, GatewayConfig};
pub use gateway::{EventCallback, Gateway, GatewayError, QueryFuture};
pub use ports::{
    diagnostics::{DiagnosticEvent, DiagnosticKind, DiagnosticSink, NoDiagnostics, TracingDiagnostics},
    transport::{
        DeliveryError, EventBusConnection, EventBusConnector, InboundFrame, MessageHandler,
        OpenHandler, TransportError,
    },
};
