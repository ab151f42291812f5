//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for received events and query responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

/// CLI arguments for busgate
#[derive(Parser, Debug)]
#[command(name = "busgate")]
#[command(author, version, about = "Event-bus gateway client - stream events and run queries")]
#[command(long_about = r#"
busgate connects to an event-bus bridge as one client identity, subscribes to
server-pushed events, and runs request/response queries over the same
connection.

Events and queries are named either symbolically (ALERTS, GET_PROPERTY) or by
their wire name (events.alerts, queries.get-property). Use --list to see the
catalogs.

Configuration files are loaded from (in priority order):
1. BUSGATE_* environment variables (e.g. BUSGATE_GATEWAY__ENDPOINT)
2. --config <path>     Explicit config file
3. ./busgate.toml      Project-level config
4. ~/.config/busgate/config.toml   Global config

Example:
  busgate --client-id u1
  busgate --client-id u1 -e ALERTS -e events.pricing
  busgate --client-id u1 -q GET_PROPERTY -d '{"id": "p1"}'
"#)]
pub struct Cli {
    /// Client identity to sign in as (falls back to gateway.client_id)
    #[arg(long, value_name = "ID")]
    pub client_id: Option<String>,

    /// Events to subscribe to (can be specified multiple times; default ALL)
    #[arg(short, long, value_name = "EVENT")]
    pub event: Vec<String>,

    /// Query to run once the gateway is ready
    #[arg(short, long, value_name = "QUERY")]
    pub query: Option<String>,

    /// JSON payload for --query
    #[arg(short, long, value_name = "JSON", requires = "query")]
    pub data: Option<String>,

    /// Keep streaming events after the query response
    #[arg(long, requires = "query")]
    pub follow: bool,

    /// Output format (overrides output.format)
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// Print the event and query catalogs and exit
    #[arg(long)]
    pub list: bool,
}

impl Cli {
    /// Whether the process should exit after the query response
    pub fn exits_after_query(&self) -> bool {
        self.query.is_some() && !self.follow
    }
}
