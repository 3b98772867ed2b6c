//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the CanonicalStore trait.

use crate::observation::{ObservationStatus, Stage};
use crate::reconcile::CanonicalRecord;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{CanonicalStore, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

const CANONICAL_COLUMNS: &str = "url, title, price, competitor, installments_text, image_url,
     status, stage, failure_reason, observed_at, aggregated_cost, attempts";

const RUN_COLUMNS: &str =
    "id, started_at, finished_at, config_hash, status, catalog_size, retried_urls, observations";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Canonical row as stored, before enum and timestamp decoding
struct StoredCanonical {
    url: String,
    title: String,
    price: i64,
    competitor: String,
    installments_text: String,
    image_url: String,
    status: String,
    stage: String,
    failure_reason: Option<String>,
    observed_at: String,
    aggregated_cost: f64,
    attempts: u32,
}

impl StoredCanonical {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            url: row.get(0)?,
            title: row.get(1)?,
            price: row.get(2)?,
            competitor: row.get(3)?,
            installments_text: row.get(4)?,
            image_url: row.get(5)?,
            status: row.get(6)?,
            stage: row.get(7)?,
            failure_reason: row.get(8)?,
            observed_at: row.get(9)?,
            aggregated_cost: row.get(10)?,
            attempts: row.get(11)?,
        })
    }

    fn into_record(self) -> StorageResult<CanonicalRecord> {
        let status = ObservationStatus::from_db_string(&self.status).ok_or_else(|| {
            StorageError::InvalidValue {
                column: "status".to_string(),
                value: self.status.clone(),
            }
        })?;
        let stage =
            Stage::from_db_string(&self.stage).ok_or_else(|| StorageError::InvalidValue {
                column: "stage".to_string(),
                value: self.stage.clone(),
            })?;
        let timestamp = DateTime::parse_from_rfc3339(&self.observed_at)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| StorageError::InvalidValue {
                column: "observed_at".to_string(),
                value: self.observed_at.clone(),
            })?;

        Ok(CanonicalRecord {
            url: self.url,
            title: self.title,
            price: self.price,
            competitor: self.competitor,
            installments_text: self.installments_text,
            image_url: self.image_url,
            status,
            stage,
            failure_reason: self.failure_reason,
            timestamp,
            aggregated_cost: self.aggregated_cost,
            attempts: self.attempts,
        })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Failed),
        catalog_size: row.get::<_, i64>(5)? as u64,
        retried_urls: row.get::<_, i64>(6)? as u64,
        observations: row.get::<_, i64>(7)? as u64,
    })
}

impl CanonicalStore for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn record_run_counts(
        &mut self,
        run_id: i64,
        catalog_size: u64,
        retried_urls: u64,
        observations: u64,
    ) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET catalog_size = ?1, retried_urls = ?2, observations = ?3 WHERE id = ?4",
            params![
                catalog_size as i64,
                retried_urls as i64,
                observations as i64,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Canonical Records =====

    fn upsert_canonical(
        &mut self,
        run_id: i64,
        records: &[CanonicalRecord],
    ) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO canonical_records (
                    url, title, price, competitor, installments_text, image_url,
                    status, stage, failure_reason, observed_at, aggregated_cost, attempts,
                    run_id, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                 ON CONFLICT(url) DO UPDATE SET
                    title = excluded.title,
                    price = excluded.price,
                    competitor = excluded.competitor,
                    installments_text = excluded.installments_text,
                    image_url = excluded.image_url,
                    status = excluded.status,
                    stage = excluded.stage,
                    failure_reason = excluded.failure_reason,
                    observed_at = excluded.observed_at,
                    aggregated_cost = excluded.aggregated_cost,
                    attempts = excluded.attempts,
                    run_id = excluded.run_id,
                    updated_at = excluded.updated_at",
            )?;

            for record in records {
                stmt.execute(params![
                    record.url,
                    record.title,
                    record.price,
                    record.competitor,
                    record.installments_text,
                    record.image_url,
                    record.status.to_db_string(),
                    record.stage.as_str(),
                    record.failure_reason,
                    record.timestamp.to_rfc3339(),
                    record.aggregated_cost,
                    record.attempts,
                    run_id,
                    now,
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!("Upserted {} canonical records for run {}", records.len(), run_id);
        Ok(records.len())
    }

    fn get_canonical(&self, url: &str) -> StorageResult<Option<CanonicalRecord>> {
        let stored = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM canonical_records WHERE url = ?1",
                    CANONICAL_COLUMNS
                ),
                params![url],
                StoredCanonical::from_row,
            )
            .optional()?;

        stored.map(StoredCanonical::into_record).transpose()
    }

    fn list_canonical(&self) -> StorageResult<Vec<CanonicalRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM canonical_records ORDER BY url",
            CANONICAL_COLUMNS
        ))?;

        let stored = stmt
            .query_map([], StoredCanonical::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        stored.into_iter().map(StoredCanonical::into_record).collect()
    }

    // ===== Statistics =====

    fn count_canonical(&self) -> StorageResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM canonical_records", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_canonical_by_status(&self) -> StorageResult<HashMap<ObservationStatus, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM canonical_records GROUP BY status")?;

        let mut summary = HashMap::new();
        let rows = stmt.query_map([], |row| {
            let status_str: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((status_str, count))
        })?;

        for row in rows {
            let (status_str, count) = row?;
            if let Some(status) = ObservationStatus::from_db_string(&status_str) {
                summary.insert(status, count as u64);
            }
        }

        Ok(summary)
    }

    fn total_aggregated_cost(&self) -> StorageResult<f64> {
        let total: f64 = self.conn.query_row(
            "SELECT COALESCE(SUM(aggregated_cost), 0.0) FROM canonical_records",
            [],
            |row| row.get(0),
        )?;
        Ok(total)
    }
}
