//! Port for diagnostic reporting.
//!
//! Defines the [`DiagnosticSink`] trait that receives protocol anomalies the
//! gateway deliberately does not surface to subscribers or query callers:
//! server-reported `error` messages and transport delivery failures.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures the raw
//! payloads in a machine-readable form.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;

/// What went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// The server sent `{"type": "error", ...}`
    ServerError,
    /// The transport failed to deliver a message
    DeliveryError,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::ServerError => "server_error",
            DiagnosticKind::DeliveryError => "delivery_error",
        }
    }
}

/// A single diagnostic record.
pub struct DiagnosticEvent {
    pub kind: DiagnosticKind,
    /// Address the problem was observed on, when known.
    pub address: Option<String>,
    /// Raw payload (server error data, or a description of the failure).
    pub payload: Value,
    pub at: DateTime<Utc>,
}

impl DiagnosticEvent {
    /// Create a new diagnostic event with the current UTC timestamp.
    pub fn new(kind: DiagnosticKind, address: Option<String>, payload: Value) -> Self {
        Self {
            kind,
            address,
            payload,
            at: Utc::now(),
        }
    }
}

/// Receives diagnostics from the gateway.
///
/// The `report` method is synchronous and non-fallible so that a failing sink
/// can never disturb message dispatch.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, event: DiagnosticEvent);
}

/// No-op implementation for tests and when diagnostics are disabled.
pub struct NoDiagnostics;

impl DiagnosticSink for NoDiagnostics {
    fn report(&self, _event: DiagnosticEvent) {}
}

/// Forwards diagnostics to the `tracing` subscriber at `warn` level.
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn report(&self, event: DiagnosticEvent) {
        warn!(
            kind = event.kind.as_str(),
            address = event.address.as_deref().unwrap_or("-"),
            "Gateway diagnostic: {}",
            event.payload
        );
    }
}
