//! Reconciliation of observations into canonical records
//!
//! Every URL seen in either pass gets exactly one canonical record:
//! - Fields, status and timestamp come from the URL's latest observation
//! - Timestamp ties go to the observation seen later (retry pass after first
//!   pass, later stages after earlier ones)
//! - `aggregated_cost` is the sum of every attempt's cost, unknown costs as 0
//!
//! Reconciliation is pure and always recomputed from the full observation set.

mod normalize;

pub use normalize::normalize_price;

use crate::observation::{ObservationRecord, ObservationStatus, Stage};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// The authoritative state of one catalog URL after a sweep
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRecord {
    pub url: String,
    pub title: String,

    /// Price as an integer amount, 0 when unknown
    pub price: i64,

    pub competitor: String,
    pub installments_text: String,
    pub image_url: String,
    pub status: ObservationStatus,

    /// Stage of the observation the fields came from
    pub stage: Stage,

    pub failure_reason: Option<String>,

    /// Completion time of the winning observation
    pub timestamp: DateTime<Utc>,

    /// Total provider cost across every attempt for this URL
    pub aggregated_cost: f64,

    /// Number of attempts made for this URL
    pub attempts: u32,
}

impl CanonicalRecord {
    fn from_latest(latest: &ObservationRecord, aggregated_cost: f64, attempts: u32) -> Self {
        Self {
            url: latest.url.clone(),
            title: latest.fields.title.clone(),
            price: normalize_price(&latest.fields.price),
            competitor: latest.fields.competitor.clone(),
            installments_text: latest.fields.installments_text.clone(),
            image_url: latest.fields.image_url.clone(),
            status: latest.status,
            stage: latest.stage,
            failure_reason: latest.failure_reason.clone(),
            timestamp: latest.timestamp,
            aggregated_cost,
            attempts,
        }
    }
}

struct Accumulator<'a> {
    latest: &'a ObservationRecord,
    cost: f64,
    attempts: u32,
}

/// Builds canonical records from both passes
///
/// # Arguments
///
/// * `first_pass` - First-pass observations
/// * `retry_pass` - Retry-pass observations, in attempt order
///
/// # Returns
///
/// One record per distinct URL, sorted by URL.
pub fn reconcile(
    first_pass: &[ObservationRecord],
    retry_pass: &[ObservationRecord],
) -> Vec<CanonicalRecord> {
    let mut by_url: BTreeMap<&str, Accumulator<'_>> = BTreeMap::new();

    for observation in first_pass.iter().chain(retry_pass) {
        let cost = observation.api_cost.or_zero();
        by_url
            .entry(observation.url.as_str())
            .and_modify(|acc| {
                acc.cost += cost;
                acc.attempts += 1;
                if observation.timestamp >= acc.latest.timestamp {
                    acc.latest = observation;
                }
            })
            .or_insert(Accumulator {
                latest: observation,
                cost,
                attempts: 1,
            });
    }

    let records: Vec<CanonicalRecord> = by_url
        .into_values()
        .map(|acc| CanonicalRecord::from_latest(acc.latest, acc.cost, acc.attempts))
        .collect();

    tracing::debug!(
        "Reconciled {} observations into {} canonical records",
        first_pass.len() + retry_pass.len(),
        records.len()
    );
    records
}
