//! Logging infrastructure - structured diagnostics logging.
//!
//! Provides [`JsonlDiagnosticSink`], a JSONL file writer that implements
//! the [`DiagnosticSink`](busgate_application::DiagnosticSink) port.

mod jsonl_diagnostics;

pub use jsonl_diagnostics::JsonlDiagnosticSink;
