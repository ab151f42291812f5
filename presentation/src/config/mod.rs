//! Presentation-level configuration
//!
//! Configuration for output formatting.

use crate::cli::commands::OutputFormat;

/// Output configuration for the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Enable colored terminal output
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            color: true,
        }
    }
}

impl OutputConfig {
    /// CLI flag wins over the file setting, which wins over the default.
    pub fn resolve(cli: Option<OutputFormat>, file: Option<OutputFormat>, color: bool) -> Self {
        Self {
            format: cli.or(file).unwrap_or(OutputFormat::Text),
            color,
        }
    }

    /// Apply the color setting to the global `colored` switch.
    pub fn apply(&self) {
        if !self.color || self.format == OutputFormat::Json {
            colored::control::set_override(false);
        }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}
