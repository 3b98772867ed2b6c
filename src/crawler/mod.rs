//! Crawler module for fetching and classifying product pages
//!
//! This module contains the fetch side of a sweep, including:
//! - The fetch provider seam and its HTTP implementation
//! - Product field extraction
//! - Attempt classification
//! - The bounded-concurrency first pass
//! - The sequential retry-pass escalation ladder

mod classifier;
mod coordinator;
mod escalation;
mod fetcher;
mod parser;
mod provider;

#[cfg(test)]
pub(crate) mod testing;

pub use classifier::{attempt, classify, TITLE_NOT_FOUND};
pub use coordinator::FetchCoordinator;
pub use escalation::{
    escalation_plan, stage_config, EscalationMachine, EscalationOutcome, EscalationState,
    SessionPolicy, StageConfig,
};
pub use fetcher::{build_http_client, ScrapflyProvider, API_COST_HEADER};
pub use parser::{ExtractedFields, FieldExtractor, HtmlExtractor};
pub use provider::{
    BudgetReport, BudgetSource, FetchError, FetchProvider, FetchRequest, FetchedPage,
    RenderOptions, RequestProfile,
};
