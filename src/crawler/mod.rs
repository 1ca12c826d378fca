//! Crawler module for paced page fetching
//!
//! This module contains the core run logic, including:
//! - HTTP fetching behind the shared token bucket
//! - Cookie loading for the HTTP client
//! - Response classification and page field extraction
//! - The per-item run coordinator

mod classifier;
mod cookies;
mod coordinator;
mod fetcher;

pub use classifier::{
    classify_response, find_price_text, has_captcha, ListingClassifier, PageClassifier, Verdict,
    CAPTCHA_MARKERS,
};
pub use cookies::{load_cookie_jar, parse_netscape_cookies, NetscapeCookie};
pub use coordinator::{Coordinator, RunReport, RunSettings, ERROR_PAUSE, FLUSH_EVERY};
pub use fetcher::{build_http_client, FetchOutcome, FetchedPage, HttpFetcher, PageFetcher};

use crate::config::Config;
use crate::input::load_items;
use crate::output::{default_output_path, write_results_csv};
use crate::pacing::CancellationSignal;
use crate::storage::{open_checkpoint, RunStatus};
use crate::PacerError;
use std::path::{Path, PathBuf};

/// What a complete session produced
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub run_id: i64,
    pub report: RunReport,
    /// Rows in the checkpoint after the run (earlier runs included)
    pub exported: usize,
    pub output_path: PathBuf,
}

/// Runs a complete session
///
/// This is the main entry point behind the CLI. It will:
/// 1. Load the items
/// 2. Open the checkpoint (clearing it when `fresh`) and start a run record
/// 3. Fetch every item not yet done
/// 4. Mark the run completed or interrupted
/// 5. Export every checkpointed result to CSV
pub async fn run_session<P>(
    config: &Config,
    config_hash: &str,
    items_path: &Path,
    fresh: bool,
    cancel: CancellationSignal,
    progress: P,
) -> Result<SessionSummary, PacerError>
where
    P: FnMut(usize, usize, &str),
{
    let items = load_items(items_path)?;

    let mut store = open_checkpoint(Path::new(&config.run.checkpoint_path))?;
    if fresh {
        tracing::info!("Fresh run requested, clearing checkpoint");
        store.clear()?;
    }
    let run_id = store.begin_run(config_hash)?;

    let fetcher = HttpFetcher::from_config(config)?;
    let settings = RunSettings::from_config(config)?;
    let mut coordinator = Coordinator::new(fetcher, store, ListingClassifier, settings, cancel);

    let outcome = coordinator.run(&items, progress).await;
    let mut store = coordinator.into_store();

    let report = match outcome {
        Ok(report) => report,
        Err(e) => {
            if let Err(mark_err) = store.finish_run(run_id, RunStatus::Failed) {
                tracing::warn!("Could not mark run {} as failed: {}", run_id, mark_err);
            }
            return Err(e);
        }
    };

    let status = if report.cancelled {
        RunStatus::Interrupted
    } else {
        RunStatus::Completed
    };
    store.finish_run(run_id, status)?;

    let rows = store.load_results()?;
    let output_dir = config.output.output_dir.as_deref().map(Path::new);
    let output_path = write_results_csv(&rows, &default_output_path(items_path, output_dir))?;

    Ok(SessionSummary {
        run_id,
        report,
        exported: rows.len(),
        output_path,
    })
}
