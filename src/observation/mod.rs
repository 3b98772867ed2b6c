//! Observation module: the outcome of a single fetch attempt
//!
//! # Components
//!
//! - `ObservationStatus`: classification of an attempt (succeeded, discarded, failed, provider error)
//! - `Stage`: which pass or escalation stage produced the attempt
//! - `ObservationRecord`: the immutable record of one attempt against one URL

mod record;
mod stage;
mod status;

// Re-export main types
pub use record::{ApiCost, ObservationRecord, ProductFields, UNKNOWN_FIELD};
pub use stage::{Stage, ESCALATION_ORDER};
pub use status::ObservationStatus;
