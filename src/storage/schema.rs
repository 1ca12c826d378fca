//! Database schema definitions for the checkpoint file

/// SQL schema for the checkpoint database
pub const SCHEMA_SQL: &str = r#"
-- Track runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- One row per item; the most recent attempt wins
CREATE TABLE IF NOT EXISTS results (
    idx INTEGER PRIMARY KEY,
    query TEXT NOT NULL,
    ok INTEGER NOT NULL,
    http_status INTEGER,
    note TEXT NOT NULL DEFAULT '',
    run_id INTEGER,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_results_ok ON results(ok);

-- Classifier output flattened into named fields (JSON-encoded values)
CREATE TABLE IF NOT EXISTS result_fields (
    idx INTEGER NOT NULL,
    name TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (idx, name)
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
