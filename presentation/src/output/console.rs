//! Console output formatter for events, query responses and catalogs

use busgate_domain::{Event, Query};
use colored::Colorize;
use serde_json::{Value, json};

/// Formats gateway traffic for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// One line per received event: `<wire type>  <compact data>`
    pub fn format_event(event: Event, data: &Value) -> String {
        format!(
            "{} {}",
            format!("[{}]", event.wire_type()).cyan().bold(),
            Self::compact(data)
        )
    }

    /// Event as a JSON line: `{"event": ..., "data": ...}`
    pub fn format_event_json(event: Event, data: &Value) -> String {
        json!({
            "event": event.wire_type(),
            "data": data,
        })
        .to_string()
    }

    /// Query response, pretty-printed under a header
    pub fn format_response(query: Query, data: &Value) -> String {
        let body = serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string());
        format!(
            "{} {}\n{}\n",
            "Response:".green().bold(),
            query.wire_type(),
            body
        )
    }

    /// Query response as a JSON line: `{"query": ..., "data": ...}`
    pub fn format_response_json(query: Query, data: &Value) -> String {
        json!({
            "query": query.wire_type(),
            "data": data,
        })
        .to_string()
    }

    /// Both catalogs, symbolic name next to wire name
    pub fn format_catalog() -> String {
        let mut output = String::new();

        output.push_str(&Self::section_header("Events"));
        for event in Event::CATALOG {
            let note = if event.is_wildcard() {
                " (every event)"
            } else {
                ""
            };
            output.push_str(&format!(
                "  {} {}{}\n",
                format!("{:<18}", event.symbol()).yellow(),
                event.wire_type(),
                note.dimmed()
            ));
        }

        output.push('\n');
        output.push_str(&Self::section_header("Queries"));
        for query in Query::CATALOG {
            output.push_str(&format!(
                "  {} {}\n",
                format!("{:<18}", query.symbol()).yellow(),
                query.wire_type()
            ));
        }

        output
    }

    /// Both catalogs as a JSON object
    pub fn format_catalog_json() -> String {
        let events: Vec<Value> = Event::CATALOG
            .iter()
            .map(|e| json!({"name": e.symbol(), "wire": e.wire_type()}))
            .collect();
        let queries: Vec<Value> = Query::CATALOG
            .iter()
            .map(|q| json!({"name": q.symbol(), "wire": q.wire_type()}))
            .collect();
        serde_json::to_string_pretty(&json!({"events": events, "queries": queries}))
            .unwrap_or_else(|_| "{}".to_string())
    }

    pub fn format_error(message: &str) -> String {
        format!("{} {}", "Error:".red().bold(), message)
    }

    fn section_header(title: &str) -> String {
        format!("{}\n", title.cyan().bold())
    }

    fn compact(data: &Value) -> String {
        serde_json::to_string(data).unwrap_or_default()
    }
}
