//! Listing-Pacer main entry point
//!
//! This is the command-line interface for the Listing-Pacer page fetcher.

use anyhow::Context;
use clap::Parser;
use listing_pacer::config::{load_config_with_hash, Config};
use listing_pacer::crawler::run_session;
use listing_pacer::output::{load_statistics, print_statistics};
use listing_pacer::storage::open_checkpoint;
use listing_pacer::CancellationSignal;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Listing-Pacer: a polite, resumable per-item page fetcher
///
/// Listing-Pacer fetches one search page per item at a bounded rate, backs
/// off when the site pushes back, and checkpoints progress so an interrupted
/// run picks up where it stopped.
#[derive(Parser, Debug)]
#[command(name = "listing-pacer")]
#[command(version = "1.0.0")]
#[command(about = "A polite, resumable per-item page fetcher", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Path to the CSV file of items (brand, model, buy price)
    #[arg(value_name = "ITEMS", required_unless_present = "stats")]
    items: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start a fresh run, discarding checkpointed results
    #[arg(long, conflicts_with = "stats")]
    fresh: bool,

    /// Show statistics from the checkpoint and exit
    #[arg(long)]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.stats {
        return handle_stats(&config);
    }

    let items = cli
        .items
        .as_deref()
        .context("an items file is required unless --stats is given")?;
    handle_run(&config, &config_hash, items, cli.fresh).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_pacer=info,warn"),
            1 => EnvFilter::new("listing_pacer=debug,info"),
            2 => EnvFilter::new("listing_pacer=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --stats mode: shows statistics from the checkpoint
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let path = Path::new(&config.run.checkpoint_path);
    println!("Checkpoint: {}\n", path.display());

    let store = open_checkpoint(path)
        .with_context(|| format!("failed to open checkpoint {}", path.display()))?;
    let stats = load_statistics(&store).context("failed to read checkpoint statistics")?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main run
async fn handle_run(
    config: &Config,
    config_hash: &str,
    items: &Path,
    fresh: bool,
) -> anyhow::Result<()> {
    let cancel = CancellationSignal::new();
    spawn_interrupt_handler(cancel.clone());

    tracing::info!(
        "Pacing at {} request(s)/min, burst {}, up to {} attempt(s) per item",
        config.rate.requests_per_minute,
        config.rate.burst,
        config.retry.max_attempts
    );

    let summary = run_session(config, config_hash, items, fresh, cancel, |done, total, message| {
        tracing::info!("[{}/{}] {}", done, total, message);
    })
    .await
    .with_context(|| format!("run over {} failed", items.display()))?;

    let report = &summary.report;
    if report.cancelled {
        tracing::warn!(
            "Run {} interrupted after {}/{} item(s); rerun to resume",
            summary.run_id,
            report.processed,
            report.total
        );
    } else {
        tracing::info!(
            "Run {} completed: {} ok, {} failed, {} skipped",
            summary.run_id,
            report.succeeded(),
            report.failed(),
            report.skipped
        );
    }

    println!(
        "Wrote {} result(s) to {}",
        summary.exported,
        summary.output_path.display()
    );

    Ok(())
}

/// Sets the cancellation signal on Ctrl-C
fn spawn_interrupt_handler(cancel: CancellationSignal) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("Interrupt received, stopping after the current wait");
                cancel.cancel();
            }
            Err(e) => tracing::error!("Could not listen for Ctrl-C: {}", e),
        }
    });
}
