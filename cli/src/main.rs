//! CLI entrypoint for busgate
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use busgate_application::{DiagnosticSink, Gateway, TracingDiagnostics};
use busgate_domain::{Event, Query};
use busgate_infrastructure::{
    ConfigLoader, FileConfig, FileOutputFormat, JsonlDiagnosticSink, WebSocketConnector,
};
use busgate_presentation::{Cli, ConsoleFormatter, OutputConfig, OutputFormat, ReadySpinner};
use clap::Parser;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(());
    }

    let file_config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };
    file_config.validate()?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_tracing(cli.verbose, file_config.logging.file.as_deref())?;

    let output = OutputConfig::resolve(
        cli.output,
        file_config.output.format.map(output_format),
        file_config.output.color,
    );
    output.apply();

    if cli.list {
        if output.is_json() {
            println!("{}", ConsoleFormatter::format_catalog_json());
        } else {
            print!("{}", ConsoleFormatter::format_catalog());
        }
        return Ok(());
    }

    let client_id = cli
        .client_id
        .clone()
        .or_else(|| file_config.gateway.client_id.clone())
        .context("A client id is required: pass --client-id or set gateway.client_id")?;
    let events = resolve_events(&cli.event)?;
    let query = cli.query.as_deref().map(str::parse::<Query>).transpose()?;
    let data: Value = match &cli.data {
        Some(text) => serde_json::from_str(text).context("--data must be valid JSON")?,
        None => json!({}),
    };

    // === Dependency Injection ===
    let gateway = build_gateway(&file_config);
    let endpoint = gateway.config().endpoint.clone();
    let deadline = gateway.config().query_timeout;

    info!("Starting busgate as {}", client_id);
    gateway.init(&client_id)?;

    for event in events {
        gateway.subscribe(event, move |data: &Value| {
            if output.is_json() {
                println!("{}", ConsoleFormatter::format_event_json(event, data));
            } else {
                println!("{}", ConsoleFormatter::format_event(event, data));
            }
        })?;
    }

    // Wait for the handshake
    let spinner = ReadySpinner::new(cli.quiet || output.is_json());
    let ready = gateway.wait_ready();
    tokio::pin!(ready);
    let mut refresh = tokio::time::interval(Duration::from_millis(200));
    let started = tokio::time::Instant::now();
    loop {
        tokio::select! {
            _ = &mut ready => break,
            _ = refresh.tick() => {
                spinner.update(gateway.state(), &endpoint);
                if let Some(limit) = deadline
                    && started.elapsed() >= limit
                {
                    spinner.finish_with_error("Gateway did not become ready");
                    bail!("Timed out after {}s waiting for {}", limit.as_secs(), endpoint);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                spinner.finish_with_error("Interrupted");
                return Ok(());
            }
        }
    }
    spinner.finish_ready(&client_id);

    if let Some(query) = query {
        let pending = gateway.execute(query, data);
        let response = match deadline {
            Some(limit) => tokio::time::timeout(limit, pending).await.map_err(|_| {
                anyhow!(
                    "Timed out after {}s waiting for {}",
                    limit.as_secs(),
                    query.wire_type()
                )
            })??,
            None => pending.await?,
        };

        if output.is_json() {
            println!("{}", ConsoleFormatter::format_response_json(query, &response));
        } else {
            println!("{}", ConsoleFormatter::format_response(query, &response));
        }

        if cli.exits_after_query() {
            return Ok(());
        }
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Interrupted, shutting down");
    Ok(())
}

/// Install the tracing subscriber: stderr always, plus a file when configured.
fn init_tracing(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let (file_layer, guard) = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Could not create log directory {}", parent.display()))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Could not open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}

fn build_gateway(config: &FileConfig) -> Gateway {
    let connector = Arc::new(
        WebSocketConnector::new().with_ping_interval(config.gateway.ping_interval()),
    );

    let diagnostics: Arc<dyn DiagnosticSink> = match &config.logging.diagnostics_file {
        Some(path) => match JsonlDiagnosticSink::new(path) {
            Some(sink) => Arc::new(sink),
            None => {
                warn!("Diagnostics file unavailable, logging diagnostics instead");
                Arc::new(TracingDiagnostics)
            }
        },
        None => Arc::new(TracingDiagnostics),
    };

    Gateway::with_diagnostics(connector, config.gateway.to_gateway_config(), diagnostics)
}

fn output_format(format: FileOutputFormat) -> OutputFormat {
    match format {
        FileOutputFormat::Text => OutputFormat::Text,
        FileOutputFormat::Json => OutputFormat::Json,
    }
}

/// Events to subscribe to. `ALL` (or no `-e` at all) expands to every
/// concrete catalog event so the server actually pushes them.
fn resolve_events(names: &[String]) -> Result<Vec<Event>> {
    let every_event = || Event::CATALOG.into_iter().filter(|e| !e.is_wildcard());

    let mut events = BTreeSet::new();
    if names.is_empty() {
        events.extend(every_event());
    }
    for name in names {
        let event: Event = name.parse()?;
        if event.is_wildcard() {
            events.extend(every_event());
        } else {
            events.insert(event);
        }
    }
    Ok(events.into_iter().collect())
}
