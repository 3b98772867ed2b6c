//! Output module for sweep summaries and statistics
//!
//! This module handles:
//! - Computing statistics over canonical records
//! - Generating markdown summaries of a sweep

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_summary, write_markdown_summary};
pub use stats::{load_statistics, print_statistics, SweepStatistics};

use crate::crawler::BudgetReport;
use crate::reconcile::CanonicalRecord;
use crate::storage::RunRecord;

/// Everything a finished sweep reports
#[derive(Debug, Clone)]
pub struct SweepSummary {
    pub run_id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub catalog_size: u64,
    pub retried_urls: u64,
    pub observations: u64,
    pub statistics: SweepStatistics,

    /// URLs without a terminal outcome and the reason recorded for them
    pub unresolved: Vec<(String, String)>,

    pub budget: Option<BudgetReport>,
}

impl SweepSummary {
    /// Builds a summary from a stored run and its canonical records
    pub fn new(run: &RunRecord, records: &[CanonicalRecord], budget: Option<BudgetReport>) -> Self {
        let unresolved = records
            .iter()
            .filter(|r| !r.status.is_terminal())
            .map(|r| {
                let reason = r
                    .failure_reason
                    .clone()
                    .unwrap_or_else(|| r.status.to_string());
                (r.url.clone(), reason)
            })
            .collect();

        Self {
            run_id: run.id,
            started_at: run.started_at.clone(),
            finished_at: run.finished_at.clone(),
            config_hash: run.config_hash.clone(),
            catalog_size: run.catalog_size,
            retried_urls: run.retried_urls,
            observations: run.observations,
            statistics: SweepStatistics::from_records(records),
            unresolved,
            budget,
        }
    }
}
