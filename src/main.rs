use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

use logdeck_client::{Dashboard, InsightsApi, InsightsPoller, LocalBackend};
use logdeck_engine::{Engine, LevelFilter, LogEvent};

mod config;
mod render;

use config::{AppConfig, SourceConfig, parse_source_arg};

/// logdeck - aggregate and browse logs from several files at once
#[derive(Parser, Debug)]
#[command(name = "logdeck")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log source to watch, in addition to the config file's
    #[arg(short, long = "source", value_name = "NAME=PATH", value_parser = parse_source_arg)]
    sources: Vec<SourceConfig>,

    /// Rows per page
    #[arg(long)]
    page_size: Option<usize>,

    /// Level filter (ERROR, WARN, INFO, DEBUG or all)
    #[arg(long, default_value = "all")]
    filter: LevelFilter,

    /// Case-insensitive search over message, component and thread
    #[arg(long)]
    search: Option<String>,

    /// Page to show
    #[arg(long, default_value = "1")]
    page: usize,

    /// Also read JSON log events, one per line, from stdin
    #[arg(long)]
    stdin_events: bool,

    /// Print one summary after loading history and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing for debugging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Run the application
    let result = run_app(args).await;

    // Handle any errors
    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

async fn run_app(args: Args) -> Result<()> {
    let mut config = AppConfig::load(args.config.as_deref())?;
    config.sources.extend(args.sources.iter().cloned());
    if let Some(page_size) = args.page_size {
        config.engine.page_size = page_size;
    }
    if config.sources.is_empty() {
        anyhow::bail!("No log sources configured; pass --source NAME=PATH or a config file");
    }

    // Push channel: backend tails and optional stdin feed into the engine
    let (push_tx, mut push_rx) = mpsc::unbounded_channel::<LogEvent>();
    let backend = LocalBackend::new(config.client.clone(), push_tx.clone());
    let mut dashboard = Dashboard::new(
        Engine::new(config.engine.clone()),
        backend,
        config.client.clone(),
    );

    for source in &config.sources {
        if let Err(e) = dashboard.add_source(source.to_request()).await {
            eprintln!("Error adding log source '{}': {}", source.name, e);
        }
    }
    if !dashboard.engine().has_any() {
        anyhow::bail!("None of the configured log sources could be opened");
    }

    // Start on the aggregate view when watching several sources
    let engine = dashboard.engine_mut();
    if engine.registry().len() > 1 {
        engine.select_source(None);
    }
    engine.set_filter(args.filter.clone());
    if let Some(term) = &args.search {
        engine.set_search(term);
    }
    engine.set_page(args.page);

    if args.once {
        print!("{}", render::render_summary(dashboard.engine()));
        match dashboard.backend().insights_handle().insights().await {
            Ok(payload) => {
                if let Some(line) = render::render_insights(&payload) {
                    println!("{}", line);
                }
            }
            Err(e) => debug!(error = %e, "insights unavailable"),
        }
        dashboard.backend().shutdown();
        return Ok(());
    }

    if args.stdin_events {
        tokio::spawn(read_stdin_events(push_tx));
    } else {
        drop(push_tx);
    }

    let (insights_tx, mut insights_rx) = mpsc::unbounded_channel();
    let poller = InsightsPoller::spawn(
        Arc::new(dashboard.backend().insights_handle()),
        Duration::from_secs(config.client.insights_interval_secs.max(1)),
        insights_tx,
    );
    let mut latest_insights = None;

    let mut changes = dashboard.engine().subscribe();
    let mut refresh = tokio::time::interval(Duration::from_millis(config.refresh_ms.max(1)));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut dirty = true;

    // Main event loop
    loop {
        tokio::select! {
            _ = &mut shutdown => break,

            // Handle incoming log events
            Some(event) = push_rx.recv() => {
                dashboard.engine_mut().ingest(event);
            }

            Ok(()) = changes.changed() => {
                dirty = true;
            }

            Some(payload) = insights_rx.recv() => {
                latest_insights = render::render_insights(&payload);
                dirty = true;
            }

            _ = refresh.tick() => {
                if dirty {
                    println!("{}", render::render_summary(dashboard.engine()));
                    if let Some(line) = &latest_insights {
                        println!("{}", line);
                    }
                    dirty = false;
                }
            }
        }
    }

    // Cleanup
    poller.stop();
    dashboard.backend().shutdown();
    Ok(())
}

/// Forward JSON events from stdin to the push channel
async fn read_stdin_events(push_tx: mpsc::UnboundedSender<LogEvent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        match LogEvent::from_json(&line) {
            Ok(event) => {
                if push_tx.send(event).is_err() {
                    break;
                }
            }
            Err(e) => debug!(error = %e, "malformed event on stdin dropped"),
        }
    }
}
