//! SQLite checkpoint implementation
//!
//! Each flush runs inside a single transaction, so a crash mid-flush leaves the
//! previous checkpoint intact rather than a truncated file.

use crate::state::{ItemResult, ResultData};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{CheckpointStore, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// SQLite checkpoint backend
pub struct SqliteCheckpoint {
    conn: Connection,
    current_run: Option<i64>,
}

impl SqliteCheckpoint {
    /// Opens or creates the checkpoint at `path`
    ///
    /// A file that SQLite cannot read as a database is renamed to
    /// `<path>.corrupt` and an empty checkpoint takes its place.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = match open_connection(path) {
            Ok(conn) => conn,
            Err(e) if path.exists() && is_corruption(&e) => {
                let aside = corrupt_path(path);
                tracing::warn!(
                    "Checkpoint {} is unreadable ({}); moving it to {} and starting empty",
                    path.display(),
                    e,
                    aside.display()
                );
                std::fs::rename(path, &aside)?;
                open_connection(path)?
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            conn,
            current_run: None,
        })
    }

    /// Creates an in-memory checkpoint (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            current_run: None,
        })
    }

    // ===== Run Management =====

    /// Starts a new run; later flushes are attributed to it
    ///
    /// Runs still marked `running` belong to a process that died without
    /// finishing and are marked `interrupted`.
    pub fn begin_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let stale = self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE status = ?2",
            params![
                RunStatus::Interrupted.to_db_string(),
                RunStatus::Running.to_db_string()
            ],
        )?;
        if stale > 0 {
            tracing::info!("Marked {} unfinished run(s) as interrupted", stale);
        }

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        let run_id = self.conn.last_insert_rowid();
        self.current_run = Some(run_id);
        Ok(run_id)
    }

    /// Records how a run ended
    pub fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        if self.current_run == Some(run_id) {
            self.current_run = None;
        }
        Ok(())
    }

    /// Gets a run by ID
    pub fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                row_to_run,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    /// Gets the most recent run
    pub fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                row_to_run,
            )
            .optional()?;
        Ok(run)
    }

    // ===== Results =====

    /// Loads every stored result ordered by idx, with its fields
    pub fn load_results(&self) -> StorageResult<Vec<ItemResult>> {
        let mut results: Vec<ItemResult> = {
            let mut stmt = self
                .conn
                .prepare("SELECT idx, query, ok, http_status, note FROM results ORDER BY idx")?;
            let rows = stmt.query_map([], |row| {
                Ok(ItemResult {
                    idx: row.get(0)?,
                    query: row.get(1)?,
                    ok: row.get(2)?,
                    data: ResultData::new(),
                    http_status: row.get(3)?,
                    note: row.get(4)?,
                })
            })?;
            let collected = rows.collect::<Result<Vec<_>, _>>()?;
            collected
        };

        let positions: HashMap<i64, usize> = results
            .iter()
            .enumerate()
            .map(|(pos, result)| (result.idx, pos))
            .collect();

        let mut stmt = self
            .conn
            .prepare("SELECT idx, name, value FROM result_fields ORDER BY idx, name")?;
        let fields = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        for field in fields {
            let (idx, name, raw) = field?;
            if let Some(&pos) = positions.get(&idx) {
                results[pos].data.insert(name, decode_value(raw));
            }
        }

        Ok(results)
    }

    /// Removes every stored result (runs are kept)
    pub fn clear(&mut self) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM result_fields", [])?;
        let removed = tx.execute("DELETE FROM results", [])?;
        tx.commit()?;
        tracing::info!("Cleared {} checkpointed result(s)", removed);
        Ok(())
    }
}

impl CheckpointStore for SqliteCheckpoint {
    fn load_done_ids(&self, only_ok: bool) -> StorageResult<HashSet<i64>> {
        let sql = if only_ok {
            "SELECT idx FROM results WHERE ok = 1"
        } else {
            "SELECT idx FROM results"
        };

        let mut stmt = self.conn.prepare(sql)?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(ids)
    }

    fn flush(&mut self, results: &[ItemResult]) -> StorageResult<()> {
        if results.is_empty() {
            return Ok(());
        }

        let now = Utc::now().to_rfc3339();
        let run_id = self.current_run;
        let tx = self.conn.transaction()?;
        {
            let mut upsert = tx.prepare_cached(
                "INSERT INTO results (idx, query, ok, http_status, note, run_id, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(idx) DO UPDATE SET
                    query = excluded.query,
                    ok = excluded.ok,
                    http_status = excluded.http_status,
                    note = excluded.note,
                    run_id = excluded.run_id,
                    recorded_at = excluded.recorded_at",
            )?;
            let mut clear_fields = tx.prepare_cached("DELETE FROM result_fields WHERE idx = ?1")?;
            let mut insert_field = tx.prepare_cached(
                "INSERT INTO result_fields (idx, name, value) VALUES (?1, ?2, ?3)",
            )?;

            for result in results {
                upsert.execute(params![
                    result.idx,
                    result.query,
                    result.ok,
                    result.http_status,
                    result.note,
                    run_id,
                    now,
                ])?;

                clear_fields.execute(params![result.idx])?;
                for (name, value) in &result.data {
                    let encoded = serde_json::to_string(value)
                        .map_err(|e| StorageError::Serialization(e.to_string()))?;
                    insert_field.execute(params![result.idx, name, encoded])?;
                }
            }
        }
        tx.commit()?;

        tracing::debug!("Flushed {} result(s) to checkpoint", results.len());
        Ok(())
    }
}

fn open_connection(path: &Path) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open(path)?;

    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
    ",
    )?;

    initialize_schema(&conn)?;

    Ok(conn)
}

/// True only for errors meaning the file is not a usable database
///
/// Busy, locked, and permission failures leave the file where it is.
fn is_corruption(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(failure.code, ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt)
    )
}

fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".corrupt");
    path.with_file_name(name)
}

fn row_to_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Failed),
    })
}

/// Decodes a stored field; values written by older tools may be bare text
fn decode_value(raw: String) -> serde_json::Value {
    serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
}
