//! The observation record produced by every fetch attempt

use crate::observation::{ObservationStatus, Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel stored in a text field whose extraction missed
pub const UNKNOWN_FIELD: &str = "n/a";

/// Provider-reported cost of one attempt
///
/// Serialized as a plain number, or `null` when the provider did not report one.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum ApiCost {
    Billed(f64),
    #[default]
    Unknown,
}

impl ApiCost {
    /// Parses a cost header value; anything non-numeric is `Unknown`
    pub fn from_header(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .map(Self::Billed)
            .unwrap_or(Self::Unknown)
    }

    /// Numeric value for aggregation, counting `Unknown` as zero
    pub fn or_zero(&self) -> f64 {
        match self {
            Self::Billed(cost) => *cost,
            Self::Unknown => 0.0,
        }
    }
}

impl From<Option<f64>> for ApiCost {
    fn from(value: Option<f64>) -> Self {
        value.map(Self::Billed).unwrap_or(Self::Unknown)
    }
}

impl From<ApiCost> for Option<f64> {
    fn from(value: ApiCost) -> Self {
        match value {
            ApiCost::Billed(cost) => Some(cost),
            ApiCost::Unknown => None,
        }
    }
}

/// Pricing attributes extracted from a product page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFields {
    pub title: String,

    /// Raw price text as shown on the page, empty when missing
    pub price: String,

    pub competitor: String,
    pub installments_text: String,
    pub image_url: String,
}

impl ProductFields {
    /// All fields at their "not found" sentinel
    pub fn unknown() -> Self {
        Self {
            title: UNKNOWN_FIELD.to_string(),
            price: String::new(),
            competitor: UNKNOWN_FIELD.to_string(),
            installments_text: UNKNOWN_FIELD.to_string(),
            image_url: UNKNOWN_FIELD.to_string(),
        }
    }

    pub fn has_title(&self) -> bool {
        self.title != UNKNOWN_FIELD
    }
}

impl Default for ProductFields {
    fn default() -> Self {
        Self::unknown()
    }
}

/// One fetch attempt against one catalog URL
///
/// Records are never mutated once created; every attempt appends a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub url: String,

    /// When the attempt completed
    pub timestamp: DateTime<Utc>,

    pub status: ObservationStatus,
    pub fields: ProductFields,
    pub api_cost: ApiCost,
    pub stage: Stage,

    /// Present for `failed` and `provider_error` observations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl ObservationRecord {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
