//! dig-engine - JSON-lines enrichment runner
//!
//! Reads `{"uid", "person"}` requests (one per line) from a file or stdin,
//! enriches every record with the built-in enricher catalog and writes one
//! `{"uid", "status", "person"}` response per request to stdout.
//!
//! Logs go to stderr so stdout stays machine-readable.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dig_common::config::ConfigResolver;
use dig_engine::batch::run_batch;
use dig_engine::enrichers::default_catalog;
use dig_engine::{Orchestrator, OrchestratorConfig};
use tokio::io::BufReader;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Command-line arguments for dig-engine
#[derive(Parser, Debug)]
#[command(name = "dig-engine")]
#[command(about = "Enrich JSON-lines person records")]
#[command(version)]
struct Args {
    /// Config file (overrides DIG_CONFIG and the user config file)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input file, `-` for stdin
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Sessions running at once (overrides engine.max_concurrent_sessions)
    #[arg(long, env = "DIG_CONCURRENCY")]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, source) = ConfigResolver::new(args.config.clone())
        .load()
        .context("Failed to load configuration")?;

    dig_common::logging::init_logging(&config.logging)
        .context("Failed to initialize logging")?;

    info!("Starting dig-engine");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        "Build: {} ({})",
        env!("GIT_HASH"),
        env!("BUILD_PROFILE")
    );
    source.log();

    let catalog = Arc::new(
        default_catalog(&config.enrichers).context("Failed to build enricher catalog")?,
    );

    let mut engine_config = OrchestratorConfig::from(&config.engine);
    if let Some(concurrency) = args.concurrency {
        engine_config.max_concurrent_sessions = concurrency.max(1);
    }
    info!(
        enrichers = catalog.len(),
        max_concurrent_sessions = engine_config.max_concurrent_sessions,
        enricher_timeout_ms = engine_config
            .enricher_timeout
            .map(|t| t.as_millis() as u64)
            .unwrap_or_default(),
        "Orchestrator ready"
    );
    let orchestrator = Orchestrator::with_config(catalog, engine_config);

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let stdout = tokio::io::stdout();
    let summary = if args.input == "-" {
        run_batch(&orchestrator, BufReader::new(tokio::io::stdin()), stdout, cancel).await
    } else {
        let file = tokio::fs::File::open(&args.input)
            .await
            .with_context(|| format!("Failed to open input file {}", args.input))?;
        run_batch(&orchestrator, BufReader::new(file), stdout, cancel).await
    }
    .context("Batch failed")?;

    info!(
        received = summary.received,
        enriched = summary.enriched,
        malformed = summary.malformed,
        cancelled = summary.cancelled,
        failed = summary.failed,
        "Shutdown complete"
    );
    Ok(())
}

/// Cancel running sessions on Ctrl+C; they return what they found so far
async fn cancel_on_signal(cancel: CancellationToken) {
    match signal::ctrl_c().await {
        Ok(()) => {
            warn!("Received Ctrl+C, cancelling sessions");
            cancel.cancel();
        }
        Err(e) => warn!(error = %e, "Failed to install Ctrl+C handler"),
    }
}
