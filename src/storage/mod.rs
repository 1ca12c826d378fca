//! Storage module for checkpointing run progress
//!
//! This module handles all checkpoint persistence, including:
//! - SQLite database initialization and schema management
//! - Atomic flushes of accumulated item results
//! - The "done" set read back when a run resumes
//! - Run tracking (start, finish, configuration hash)

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteCheckpoint;
pub use traits::{CheckpointStore, StorageError, StorageResult};

use std::path::Path;

/// Opens (or creates) the checkpoint at `path`
///
/// An unreadable file is moved aside and replaced with an empty checkpoint.
pub fn open_checkpoint(path: &Path) -> StorageResult<SqliteCheckpoint> {
    SqliteCheckpoint::open(path)
}

/// Represents a run in the checkpoint database
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_roundtrip() {
        for status in &[
            RunStatus::Running,
            RunStatus::Completed,
            RunStatus::Interrupted,
            RunStatus::Failed,
        ] {
            let db_str = status.to_db_string();
            let parsed = RunStatus::from_db_string(db_str);
            assert_eq!(Some(*status), parsed);
        }
    }

    #[test]
    fn test_run_status_invalid() {
        assert_eq!(RunStatus::from_db_string("invalid"), None);
    }
}
