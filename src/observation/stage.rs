//! Stage identifiers for fetch attempts

use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed escalation order of the retry pass
pub const ESCALATION_ORDER: [Stage; 5] = [
    Stage::FirstAttempt,
    Stage::SecondAttempt,
    Stage::HeavyRetry,
    Stage::RescuePass,
    Stage::DeepRescue,
];

/// Which pass or escalation stage produced an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// The single implicit stage of the first pass
    Primary,
    FirstAttempt,
    SecondAttempt,
    HeavyRetry,
    RescuePass,
    DeepRescue,
}

impl Stage {
    /// Returns the stage that follows this one in the retry ladder
    ///
    /// `Primary` is not part of the ladder and `DeepRescue` is the last rung,
    /// so both return None.
    pub fn next_escalation(self) -> Option<Stage> {
        match self {
            Self::FirstAttempt => Some(Self::SecondAttempt),
            Self::SecondAttempt => Some(Self::HeavyRetry),
            Self::HeavyRetry => Some(Self::RescuePass),
            Self::RescuePass => Some(Self::DeepRescue),
            Self::Primary | Self::DeepRescue => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::FirstAttempt => "first_attempt",
            Self::SecondAttempt => "second_attempt",
            Self::HeavyRetry => "heavy_retry",
            Self::RescuePass => "rescue_pass",
            Self::DeepRescue => "deep_rescue",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "primary" => Some(Self::Primary),
            "first_attempt" => Some(Self::FirstAttempt),
            "second_attempt" => Some(Self::SecondAttempt),
            "heavy_retry" => Some(Self::HeavyRetry),
            "rescue_pass" => Some(Self::RescuePass),
            "deep_rescue" => Some(Self::DeepRescue),
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
