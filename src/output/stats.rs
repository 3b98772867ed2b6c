//! Statistics over canonical records
//!
//! This module provides functionality for summarizing canonical records,
//! either freshly reconciled or loaded back from storage, and for displaying
//! the result.

use crate::observation::ObservationStatus;
use crate::reconcile::CanonicalRecord;
use crate::storage::CanonicalStore;
use crate::SweepError;
use std::collections::HashMap;

/// Sweep statistics summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepStatistics {
    /// Number of canonical records
    pub total_records: u64,

    /// Count of records by final status
    pub by_status: HashMap<ObservationStatus, u64>,

    /// Total attempts across all records, when known
    pub total_attempts: Option<u64>,

    /// Sum of aggregated cost across all records
    pub total_cost: f64,
}

impl SweepStatistics {
    /// Computes statistics from canonical records
    pub fn from_records(records: &[CanonicalRecord]) -> Self {
        let mut by_status = HashMap::new();
        for record in records {
            *by_status.entry(record.status).or_insert(0) += 1;
        }

        Self {
            total_records: records.len() as u64,
            by_status,
            total_attempts: Some(records.iter().map(|r| r.attempts as u64).sum()),
            total_cost: records.iter().map(|r| r.aggregated_cost).sum(),
        }
    }

    pub fn count(&self, status: ObservationStatus) -> u64 {
        self.by_status.get(&status).copied().unwrap_or(0)
    }

    /// Share of records that ended with a terminal outcome, in percent
    pub fn resolved_rate(&self) -> f64 {
        if self.total_records == 0 {
            return 0.0;
        }
        let resolved =
            self.count(ObservationStatus::Succeeded) + self.count(ObservationStatus::Discarded);
        (resolved as f64 / self.total_records as f64) * 100.0
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(SweepStatistics)` - Successfully loaded statistics
/// * `Err(SweepError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn CanonicalStore) -> Result<SweepStatistics, SweepError> {
    let records = storage.list_canonical()?;
    let mut stats = SweepStatistics::from_records(&records);

    // Counters come from SQL so they agree with what was stored
    stats.total_records = storage.count_canonical()?;
    stats.by_status = storage.count_canonical_by_status()?;
    stats.total_cost = storage.total_aggregated_cost()?;

    Ok(stats)
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &SweepStatistics) {
    println!("=== Sweep Statistics ===\n");

    println!("Overview:");
    println!("  Canonical records: {}", stats.total_records);
    if let Some(attempts) = stats.total_attempts {
        println!("  Fetch attempts: {}", attempts);
    }
    println!("  Total provider cost: {:.3}", stats.total_cost);
    println!("  Resolved: {:.1}%", stats.resolved_rate());
    println!();

    println!("Records by Status:");
    for status in ObservationStatus::all_statuses() {
        let count = stats.count(status);
        let percentage = if stats.total_records > 0 {
            (count as f64 / stats.total_records as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();
}
