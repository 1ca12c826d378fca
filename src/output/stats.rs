//! Statistics generation from the checkpoint database
//!
//! This module provides functionality for summarising what a checkpoint
//! holds, for the `--stats` command.

use crate::state::ItemResult;
use crate::storage::{RunRecord, SqliteCheckpoint, StorageError};
use std::collections::BTreeMap;

/// Checkpoint statistics summary
#[derive(Debug, Clone, Default)]
pub struct RunStatistics {
    /// Total number of recorded items
    pub total_results: u64,

    /// Items recorded with `ok = true`
    pub succeeded: u64,

    /// Failure notes and their counts
    pub failures_by_note: BTreeMap<String, u64>,

    /// HTTP status codes and their counts (network failures excluded)
    pub status_counts: BTreeMap<u16, u64>,

    /// The most recent run, if any
    pub latest_run: Option<RunRecord>,
}

impl RunStatistics {
    /// Builds statistics from stored results
    pub fn from_results(results: &[ItemResult], latest_run: Option<RunRecord>) -> Self {
        let mut stats = Self {
            latest_run,
            ..Self::default()
        };

        for result in results {
            stats.total_results += 1;
            if result.ok {
                stats.succeeded += 1;
            } else {
                *stats.failures_by_note.entry(failure_label(result)).or_insert(0) += 1;
            }
            if let Some(status) = result.http_status {
                *stats.status_counts.entry(status).or_insert(0) += 1;
            }
        }

        stats
    }

    pub fn failed(&self) -> u64 {
        self.total_results - self.succeeded
    }
}

/// Network failures carry free-form notes; group them under one label
fn failure_label(result: &ItemResult) -> String {
    if result.http_status.is_none() {
        "network".to_string()
    } else {
        result.note.clone()
    }
}

/// Loads statistics from the checkpoint
pub fn load_statistics(store: &SqliteCheckpoint) -> Result<RunStatistics, StorageError> {
    let results = store.load_results()?;
    let latest_run = store.get_latest_run()?;
    Ok(RunStatistics::from_results(&results, latest_run))
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Checkpoint Statistics ===\n");

    if let Some(run) = &stats.latest_run {
        println!("Latest run:");
        println!("  Id: {}", run.id);
        println!("  Status: {}", run.status.to_db_string());
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!("  Config hash: {}", run.config_hash);
        println!();
    }

    println!("Overview:");
    println!("  Recorded items: {}", stats.total_results);
    println!("  Succeeded: {}", stats.succeeded);
    println!("  Failed: {}", stats.failed());
    println!();

    if !stats.failures_by_note.is_empty() {
        println!("Failures by reason:");
        let mut failures: Vec<_> = stats.failures_by_note.iter().collect();
        failures.sort_by(|a, b| b.1.cmp(a.1));
        for (note, count) in failures {
            println!("  {}: {}", note, count);
        }
        println!();
    }

    if !stats.status_counts.is_empty() {
        println!("HTTP status codes:");
        for (status, count) in &stats.status_counts {
            println!("  {}: {}", status, count);
        }
        println!();
    }

    let success_rate = if stats.total_results > 0 {
        (stats.succeeded as f64 / stats.total_results as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} items)",
        success_rate, stats.succeeded, stats.total_results
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ResultData;
    use crate::storage::CheckpointStore;

    fn sample() -> Vec<ItemResult> {
        vec![
            ItemResult::success(0, "a", ResultData::new()),
            ItemResult::failure(1, "b", Some(429), "rate"),
            ItemResult::failure(2, "c", Some(503), "rate"),
            ItemResult::failure(3, "d", None, "error sending request: timed out"),
        ]
    }

    #[test]
    fn test_statistics_from_results() {
        let stats = RunStatistics::from_results(&sample(), None);

        assert_eq!(stats.total_results, 4);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.failed(), 3);
        assert_eq!(stats.failures_by_note.get("rate"), Some(&2));
        assert_eq!(stats.failures_by_note.get("network"), Some(&1));
        assert_eq!(stats.status_counts.get(&200), Some(&1));
        assert_eq!(stats.status_counts.get(&429), Some(&1));
    }

    #[test]
    fn test_load_statistics_from_checkpoint() {
        let mut store = SqliteCheckpoint::new_in_memory().unwrap();
        let run_id = store.begin_run("hash").unwrap();
        store.flush(&sample()).unwrap();

        let stats = load_statistics(&store).unwrap();
        assert_eq!(stats.total_results, 4);
        assert_eq!(stats.latest_run.unwrap().id, run_id);
    }

    #[test]
    fn test_empty_checkpoint() {
        let store = SqliteCheckpoint::new_in_memory().unwrap();
        let stats = load_statistics(&store).unwrap();
        assert_eq!(stats.total_results, 0);
        assert!(stats.latest_run.is_none());
    }
}
