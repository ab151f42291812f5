//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Unknown query: {0}")]
    UnknownQuery(String),

    #[error("Invalid client id: {0}")]
    InvalidClientId(String),

    #[error("Malformed message: {0}")]
    MalformedMessage(String),
}

impl DomainError {
    /// Check if this error comes from catalog validation
    pub fn is_catalog_error(&self) -> bool {
        matches!(
            self,
            DomainError::UnknownEvent(_) | DomainError::UnknownQuery(_)
        )
    }
}
