//! Checkpoint store trait and error types

use crate::state::ItemResult;
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during checkpoint operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable mapping from item identity to completion state
///
/// This is the narrow surface the run orchestrator needs. Implementations must
/// make `flush` all-or-nothing: a failure part way through must leave the
/// previously flushed rows readable.
pub trait CheckpointStore {
    /// Returns the idx values already recorded
    ///
    /// With `only_ok`, rows recorded as failures are not counted as done.
    fn load_done_ids(&self, only_ok: bool) -> StorageResult<HashSet<i64>>;

    /// Persists every result in `results`, replacing earlier rows with the same idx
    fn flush(&mut self, results: &[ItemResult]) -> StorageResult<()>;
}
