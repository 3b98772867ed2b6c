//! Storage traits and error types
//!
//! This module defines the trait interface for canonical record storage and
//! the associated error types.

use crate::observation::ObservationStatus;
use crate::reconcile::CanonicalRecord;
use crate::storage::{RunRecord, RunStatus};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Invalid stored value in {column}: {value}")]
    InvalidValue { column: String, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence for sweep runs and canonical records
pub trait CanonicalStore {
    // ===== Run Management =====

    /// Creates a new run in the `running` state
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Records the sizes a run worked with
    fn record_run_counts(
        &mut self,
        run_id: i64,
        catalog_size: u64,
        retried_urls: u64,
        observations: u64,
    ) -> StorageResult<()>;

    /// Sets the final status of a run and stamps its finish time
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Canonical Records =====

    /// Inserts new records and overwrites existing ones, keyed by URL
    ///
    /// All records are written in a single transaction.
    fn upsert_canonical(&mut self, run_id: i64, records: &[CanonicalRecord])
        -> StorageResult<usize>;

    /// Gets the canonical record for a URL
    fn get_canonical(&self, url: &str) -> StorageResult<Option<CanonicalRecord>>;

    /// Lists all canonical records ordered by URL
    fn list_canonical(&self) -> StorageResult<Vec<CanonicalRecord>>;

    // ===== Statistics =====

    fn count_canonical(&self) -> StorageResult<u64>;

    fn count_canonical_by_status(&self) -> StorageResult<HashMap<ObservationStatus, u64>>;

    /// Sum of `aggregated_cost` over all canonical records
    fn total_aggregated_cost(&self) -> StorageResult<f64>;
}
