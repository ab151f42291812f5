//! Gateway error taxonomy

use crate::ports::transport::TransportError;
use busgate_domain::DomainError;
use thiserror::Error;

/// Errors returned by [`Gateway`](super::Gateway) operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Gateway already initialized")]
    AlreadyInitialized,

    #[error("Gateway not initialized; call init first")]
    NotInitialized,

    #[error("Gateway not connected yet")]
    NotConnected,

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Unknown query: {0}")]
    UnknownQuery(String),

    #[error("Invalid client id: {0}")]
    InvalidClientId(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Query abandoned before a response arrived")]
    QueryAbandoned,
}

impl GatewayError {
    /// Errors caused by calling an operation in the wrong lifecycle state
    pub fn is_lifecycle_error(&self) -> bool {
        matches!(
            self,
            GatewayError::AlreadyInitialized
                | GatewayError::NotInitialized
                | GatewayError::NotConnected
        )
    }
}

impl From<DomainError> for GatewayError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::UnknownEvent(name) => GatewayError::UnknownEvent(name),
            DomainError::UnknownQuery(name) => GatewayError::UnknownQuery(name),
            DomainError::InvalidClientId(id) => GatewayError::InvalidClientId(id),
            DomainError::MalformedMessage(reason) => GatewayError::Serialization(reason),
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Serialization(err.to_string())
    }
}
