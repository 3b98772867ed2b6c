//! Database schema definitions
//!
//! This module contains the SQL schema for the sweep database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track sweep runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    catalog_size INTEGER NOT NULL DEFAULT 0,
    retried_urls INTEGER NOT NULL DEFAULT 0,
    observations INTEGER NOT NULL DEFAULT 0
);

-- One authoritative record per catalog URL
CREATE TABLE IF NOT EXISTS canonical_records (
    url TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    price INTEGER NOT NULL,
    competitor TEXT NOT NULL,
    installments_text TEXT NOT NULL,
    image_url TEXT NOT NULL,
    status TEXT NOT NULL,
    stage TEXT NOT NULL,
    failure_reason TEXT,
    observed_at TEXT NOT NULL,
    aggregated_cost REAL NOT NULL,
    attempts INTEGER NOT NULL,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_canonical_status ON canonical_records(status);
CREATE INDEX IF NOT EXISTS idx_canonical_run ON canonical_records(run_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
