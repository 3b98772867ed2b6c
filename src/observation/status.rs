//! Observation status definitions
//!
//! This module defines every classification an attempt can end in.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a single fetch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationStatus {
    // ===== Terminal States =====
    /// Page fetched and the product title was found
    Succeeded,

    /// Page carried the "item unavailable" marker; nothing left to retry
    Discarded,

    // ===== Retryable States =====
    /// Page fetched but a required field (the title) was missing
    Failed,

    /// The fetch provider or transport failed before any content arrived
    ProviderError,
}

impl ObservationStatus {
    /// Returns true if this classification stops further escalation
    ///
    /// Only `Succeeded` and `Discarded` are terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Discarded)
    }

    /// Returns true if the URL should be handed to the retry pass
    pub fn is_retryable(&self) -> bool {
        !self.is_terminal()
    }

    /// Converts the status to its storage string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Discarded => "discarded",
            Self::Failed => "failed",
            Self::ProviderError => "provider_error",
        }
    }

    /// Parses a status from its storage string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "succeeded" => Some(Self::Succeeded),
            "discarded" => Some(Self::Discarded),
            "failed" => Some(Self::Failed),
            "provider_error" => Some(Self::ProviderError),
            _ => None,
        }
    }

    /// Returns all statuses
    pub fn all_statuses() -> Vec<Self> {
        vec![
            Self::Succeeded,
            Self::Discarded,
            Self::Failed,
            Self::ProviderError,
        ]
    }
}

impl fmt::Display for ObservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
