//! Run coordinator - the per-item fetch loop
//!
//! For every item the coordinator:
//! - Skips it if the checkpoint already records it as done
//! - Fetches its search page through the rate-limited fetcher
//! - Classifies the response and backs off on soft blocks
//! - Records exactly one result, flushing to the checkpoint every few results
//!
//! Cancellation is polled before every fetch and inside every wait. An item
//! whose processing is interrupted is abandoned without a result.

use crate::config::Config;
use crate::crawler::classifier::{classify_response, PageClassifier, Verdict};
use crate::crawler::fetcher::{FetchOutcome, PageFetcher};
use crate::pacing::{interruptible_sleep, BackoffPolicy, CancellationSignal};
use crate::state::{Item, ItemResult, ItemState};
use crate::storage::CheckpointStore;
use crate::PacerError;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use url::Url;

/// Number of accumulated results between periodic checkpoint flushes
pub const FLUSH_EVERY: usize = 5;

/// Pause after an HTTP error or network failure
pub const ERROR_PAUSE: Duration = Duration::from_secs(1);

/// Loop settings taken from the configuration
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub base_url: Url,
    pub query_param: String,
    pub max_attempts: u32,
    pub retry_failed: bool,
}

impl RunSettings {
    pub fn from_config(config: &Config) -> Result<Self, PacerError> {
        Ok(Self {
            base_url: Url::parse(&config.client.base_url)?,
            query_param: config.client.query_param.clone(),
            max_attempts: config.retry.max_attempts.max(1),
            retry_failed: config.run.retry_failed,
        })
    }
}

/// Summary of one pass over the items
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Results recorded in this run, in processing order
    pub results: Vec<ItemResult>,

    /// Items recorded or skipped
    pub processed: usize,

    /// Items skipped because the checkpoint already had them
    pub skipped: usize,

    /// Items handed to the run
    pub total: usize,

    /// Whether the run stopped on the cancellation signal
    pub cancelled: bool,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.ok).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

enum ItemOutcome {
    Recorded(ItemResult),
    Cancelled,
}

/// Main run coordinator
pub struct Coordinator<F, S, C> {
    fetcher: F,
    store: S,
    classifier: C,
    settings: RunSettings,
    backoff: BackoffPolicy,
    cancel: CancellationSignal,
}

impl<F, S, C> Coordinator<F, S, C>
where
    F: PageFetcher,
    S: CheckpointStore,
    C: PageClassifier,
{
    pub fn new(
        fetcher: F,
        store: S,
        classifier: C,
        settings: RunSettings,
        cancel: CancellationSignal,
    ) -> Self {
        Self {
            fetcher,
            store,
            classifier,
            settings,
            backoff: BackoffPolicy::default(),
            cancel,
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Runs the fetch loop over `items` in order
    ///
    /// `progress` receives `(processed, total, message)` before each fetch and
    /// after each item is recorded or skipped. Per-item failures are recorded,
    /// never returned; the only error is a failed final checkpoint flush.
    pub async fn run<P>(
        &mut self,
        items: &[Item],
        mut progress: P,
    ) -> Result<RunReport, PacerError>
    where
        P: FnMut(usize, usize, &str),
    {
        let total = items.len();
        let done = self.load_done_set();
        let mut attempts: HashMap<i64, u32> = HashMap::new();
        let mut report = RunReport {
            total,
            ..RunReport::default()
        };

        tracing::info!(
            "Starting run over {} item(s), {} already in checkpoint",
            total,
            done.len()
        );

        for item in items {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            if done.contains(&item.idx) {
                report.processed += 1;
                report.skipped += 1;
                tracing::debug!("Skipping idx={} (already done)", item.idx);
                progress(report.processed, total, &format!("skip idx={}", item.idx));
                continue;
            }

            let outcome = self
                .process_item(item, &mut attempts, report.processed, total, &mut progress)
                .await;

            let result = match outcome {
                ItemOutcome::Recorded(result) => result,
                ItemOutcome::Cancelled => {
                    tracing::info!("Cancelled while processing idx={}", item.idx);
                    report.cancelled = true;
                    break;
                }
            };

            let message = if result.ok {
                format!("processed idx={}", item.idx)
            } else {
                format!("processed idx={} ({})", item.idx, result.note)
            };
            report.results.push(result);
            report.processed += 1;
            progress(report.processed, total, &message);

            if report.results.len() % FLUSH_EVERY == 0 {
                if let Err(e) = self.store.flush(&report.results) {
                    tracing::warn!("Periodic checkpoint flush failed: {}", e);
                } else {
                    tracing::debug!("Checkpointed {} result(s)", report.results.len());
                }
            }
        }

        if !report.results.is_empty() {
            self.store.flush(&report.results)?;
        }

        tracing::info!(
            "Run {}: {} processed ({} skipped), {} ok, {} failed",
            if report.cancelled { "interrupted" } else { "finished" },
            report.processed,
            report.skipped,
            report.succeeded(),
            report.failed()
        );

        Ok(report)
    }

    /// Loads the done set, treating an unreadable checkpoint as empty
    fn load_done_set(&self) -> HashSet<i64> {
        match self.store.load_done_ids(self.settings.retry_failed) {
            Ok(done) => done,
            Err(e) => {
                tracing::warn!("Checkpoint unreadable, starting from scratch: {}", e);
                HashSet::new()
            }
        }
    }

    /// Drives one item until it is recorded or the run is cancelled
    async fn process_item<P>(
        &self,
        item: &Item,
        attempts: &mut HashMap<i64, u32>,
        processed: usize,
        total: usize,
        progress: &mut P,
    ) -> ItemOutcome
    where
        P: FnMut(usize, usize, &str),
    {
        let query = item.query();
        let params = [(self.settings.query_param.as_str(), query.as_str())];
        let mut state = ItemState::Pending;

        loop {
            if self.cancel.is_cancelled() {
                return ItemOutcome::Cancelled;
            }

            advance(item.idx, &mut state, ItemState::Fetching);
            progress(
                processed,
                total,
                &format!("GET {} q={}", self.settings.base_url, query),
            );

            let verdict = match self
                .fetcher
                .fetch(&self.settings.base_url, &params, &self.cancel)
                .await
            {
                FetchOutcome::Cancelled => return ItemOutcome::Cancelled,
                FetchOutcome::NetworkError(message) => Verdict::network_error(message),
                FetchOutcome::Response(page) => classify_response(&page, &self.classifier),
            };
            advance(item.idx, &mut state, verdict.state);

            if state.is_soft_block() {
                let attempt = attempts.entry(item.idx).or_insert(0);
                *attempt += 1;
                let attempt = *attempt;

                tracing::warn!(
                    "idx={} {} (HTTP {}), attempt {}/{}",
                    item.idx,
                    state,
                    verdict.http_status.unwrap_or_default(),
                    attempt,
                    self.settings.max_attempts
                );

                let waited = self
                    .backoff
                    .wait(attempt, verdict.retry_after, &self.cancel)
                    .await;
                if waited.is_cancelled() {
                    return ItemOutcome::Cancelled;
                }

                if attempt < self.settings.max_attempts {
                    continue;
                }
            } else if state.needs_pause() {
                tracing::warn!("idx={} {}: {}", item.idx, state, verdict.note);
                if interruptible_sleep(ERROR_PAUSE, &self.cancel).await.is_cancelled() {
                    return ItemOutcome::Cancelled;
                }
            } else {
                tracing::debug!("idx={} fetched", item.idx);
            }

            advance(item.idx, &mut state, ItemState::Recorded);
            return ItemOutcome::Recorded(verdict.into_result(item.idx, query));
        }
    }
}

fn advance(idx: i64, state: &mut ItemState, next: ItemState) {
    debug_assert!(
        state.can_transition_to(next),
        "illegal transition {} -> {} for idx={}",
        state,
        next,
        idx
    );
    tracing::trace!("idx={} {} -> {}", idx, state, next);
    *state = next;
}
