//! # depthvault
//!
//! Main entry point for the order book persistence service.
//!
//! Loads a JSON configuration file, connects the storage backend, starts the
//! persistence pipeline and any configured producers, and runs the ordered
//! shutdown on SIGINT/SIGTERM.
//!
//! # Usage
//!
//! ```bash
//! depthvault --config config.json --log-level info
//! depthvault --config config.json --store memory --dry-run
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use dv_core::config::{self, BackendKind, StoreConfig};
use dv_store::replay::ReplayProducer;
use dv_store::{Pipeline, PipelineContext, registry};
use tracing::{error, info, warn};

/// Order book snapshot persistence service.
#[derive(Parser)]
#[command(name = "depthvault", version, about = "Order book snapshot persistence service")]
struct Cli {
    /// Configuration file path (JSON). Defaults to `./config.json`.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not write the config file back on exit.
    #[arg(long)]
    dry_run: bool,

    /// Override the configured store backend (mongo, memory).
    #[arg(long)]
    store: Option<BackendKind>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output (overrides `log_path`).
    #[arg(long)]
    log_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);

    // 1. Load configuration
    let app_config = config::load_config(&config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    let store_config = runtime_store(&app_config.store, cli.store);

    // 2. Initialize logging
    let log_dir = cli.log_dir.clone().or_else(|| app_config.log_path.clone());
    dv_core::logging::init_logging(&cli.log_level, log_dir.as_deref(), &app_config.name);

    info!(
        "{} v{} starting, config={}, dry_run={}",
        app_config.name,
        env!("CARGO_PKG_VERSION"),
        config_path.display(),
        cli.dry_run
    );
    info!(
        "store: backend={} address={} target={} capacity={} retries={}x{}ms",
        store_config.backend,
        store_config.address,
        store_config.namespace(),
        store_config.queue_capacity,
        store_config.max_retries,
        store_config.retry_delay_ms,
    );

    // 3. Connect the backend and start the pipeline. Connection failure is
    //    fatal: there is no pipeline without a target.
    let ctx = PipelineContext { store: store_config.clone(), ..PipelineContext::from_config(&app_config) };
    let started = tokio::task::spawn_blocking(move || -> Result<Pipeline> {
        let client = registry::connect_store(&store_config)?;
        Pipeline::start(&ctx, client)
    })
    .await?;
    let pipeline = match started {
        Ok(p) => p,
        Err(e) => {
            error!("cannot start persistence pipeline: {e:#}");
            return Err(e);
        }
    };

    // 4. Start producers
    let mut replay = ReplayProducer::new(app_config.replay.clone());
    if !app_config.replay.is_empty() {
        replay.start(pipeline.sink())?;
    }

    info!("pipeline running, press Ctrl+C to stop");

    // 5. Wait for shutdown signal
    let signal = shutdown_signal().await?;
    info!("captured {signal}, shutdown requested");

    // 6. Stop producers, then flush and close the pipeline
    let report = tokio::task::spawn_blocking(move || -> Result<_> {
        let replayed = replay.stop()?;
        info!("producers stopped, replayed={} skipped={}", replayed.submitted, replayed.skipped);
        pipeline.shutdown()
    })
    .await??;

    info!("final: {}", report.stats);
    if let Some(lat) = report.latency {
        info!("write latency: {lat}");
    }
    if report.stats.dropped > 0 {
        warn!("{} snapshot(s) were dropped after exhausting retries", report.stats.dropped);
    }

    // 7. Persist config unless dry-run
    if cli.dry_run {
        info!("dry run, config file not saved");
    } else {
        match config::save_config(&app_config, &config_path) {
            Ok(()) => info!("config file saved to {}", config_path.display()),
            Err(e) => error!("unable to save config: {e:#}"),
        }
    }

    info!("exiting");
    Ok(())
}

/// Store settings for this run: the loaded config with any `--store`
/// override applied. The loaded config itself is left untouched so the
/// override is never written back on exit.
fn runtime_store(loaded: &StoreConfig, backend: Option<BackendKind>) -> StoreConfig {
    let mut store = loaded.clone();
    if let Some(backend) = backend {
        store.backend = backend;
    }
    store
}

/// Wait for SIGINT or SIGTERM and return the signal name.
#[cfg(unix)]
async fn shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            Ok("SIGINT")
        }
        _ = term.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("Ctrl+C")
}
