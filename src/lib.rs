//! Catalog-Sweep: competitor catalog price sweeper
//!
//! This crate fetches competitor product pages through a rendering fetch
//! provider, classifies every attempt into an observation, escalates failed
//! pages through a fixed retry ladder, and reconciles all attempts into one
//! canonical record per catalog URL.

pub mod catalog;
pub mod checkpoint;
pub mod config;
pub mod crawler;
pub mod observation;
pub mod output;
pub mod pipeline;
pub mod reconcile;
pub mod storage;

use thiserror::Error;

/// Main error type for Catalog-Sweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Fetch provider error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] checkpoint::CheckpointError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    /// An attempt escaped its boundary (panicked or was cancelled) instead of
    /// producing an observation. This is a contract bug and halts the run.
    #[error("Attempt boundary violated for {url}: {message}")]
    AttemptBoundary { url: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector for {field}: {selector}")]
    InvalidSelector { field: String, selector: String },
}

/// Result type alias for Catalog-Sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

// Re-export commonly used types
pub use config::Config;
pub use observation::{ApiCost, ObservationRecord, ObservationStatus, ProductFields, Stage};
pub use reconcile::{reconcile, CanonicalRecord};
