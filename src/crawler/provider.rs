//! Fetch provider seam
//!
//! The crawler never talks HTTP to the catalog site itself. Every page goes
//! through a rendering fetch provider, described here as the `FetchProvider`
//! trait together with the request shape the passes build for it.

use crate::config::{ExtractionConfig, ProviderConfig};
use crate::observation::ApiCost;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a fetch provider for a single request
///
/// These never escape an attempt: the classifier turns each of them into a
/// `provider_error` observation.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The provider answered but refused or failed the scrape
    #[error("provider error {}: {message}", .code.as_deref().unwrap_or("(no code)"))]
    Provider {
        code: Option<String>,
        message: String,
    },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection, TLS, or body transfer failure
    #[error("transport failure: {0}")]
    Transport(String),

    /// Anything else, including malformed provider payloads
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl FetchError {
    /// Reason code recorded on the observation
    ///
    /// Provider-supplied codes are preserved verbatim; everything else gets a
    /// generic tag.
    pub fn reason_code(&self) -> String {
        match self {
            Self::Provider {
                code: Some(code), ..
            } if !code.is_empty() => code.clone(),
            Self::Provider { .. } => "provider_error".to_string(),
            Self::Timeout(_) => "timeout".to_string(),
            Self::Transport(_) => "transport_error".to_string(),
            Self::Unexpected(_) => "unexpected_error".to_string(),
        }
    }
}

/// Rendering options forwarded to the provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// CSS selector the provider waits for before returning the page
    pub wait_for_selector: Option<String>,

    /// Extra time the provider lets the page render
    pub rendering_wait: Option<Duration>,

    /// Scroll the page to trigger lazy content
    pub auto_scroll: bool,
}

/// One request to the fetch provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,

    /// Request-scoped session token; concurrent requests never share one
    pub session: String,

    pub country: String,
    pub languages: Vec<String>,
    pub proxy_pool: String,
    pub cost_budget: u32,

    /// Hard bound on the whole request, enforced client side
    pub timeout: Duration,

    /// Let the provider retry internally. Provider-side timeouts are only
    /// sent when this is off.
    pub provider_retry: bool,

    pub render: RenderOptions,
}

/// Content returned by a successful provider call
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub content: String,
    pub api_cost: ApiCost,
}

/// A rendering fetch provider
#[async_trait]
pub trait FetchProvider: Send + Sync {
    /// Fetches one page. Implementations report every failure as `FetchError`.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedPage, FetchError>;
}

/// Remaining provider credits and the current billing period
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetReport {
    pub remaining_credits: i64,
    pub period_start: Option<String>,
    pub period_end: Option<String>,
}

impl BudgetReport {
    /// Human-readable status line used for the end-of-run notification
    pub fn status_line(&self) -> String {
        format!(
            "Sweep finished\nremaining credits: {}\nsubscription start: {}\nsubscription end: {}",
            self.remaining_credits,
            self.period_start.as_deref().unwrap_or("unknown"),
            self.period_end.as_deref().unwrap_or("unknown"),
        )
    }
}

/// Source of the provider's remaining credit count
#[async_trait]
pub trait BudgetSource: Send + Sync {
    async fn remaining_budget(&self) -> Result<BudgetReport, FetchError>;
}

/// Provider affinity shared by every request of a sweep
///
/// Built once from configuration; each pass stamps it with a URL, a session
/// token and its own rendering options.
#[derive(Debug, Clone)]
pub struct RequestProfile {
    pub country: String,
    pub languages: Vec<String>,
    pub proxy_pool: String,
    pub cost_budget: u32,
    pub wait_for_selector: String,
}

impl RequestProfile {
    pub fn from_config(provider: &ProviderConfig, extraction: &ExtractionConfig) -> Self {
        Self {
            country: provider.country.clone(),
            languages: provider.languages.clone(),
            proxy_pool: provider.proxy_pool.clone(),
            cost_budget: provider.cost_budget,
            wait_for_selector: extraction.wait_for_selector.clone(),
        }
    }

    /// Builds a request that waits for the product element and does not
    /// ask the provider to retry
    pub fn request(&self, url: &str, session: String, timeout: Duration) -> FetchRequest {
        FetchRequest {
            url: url.to_string(),
            session,
            country: self.country.clone(),
            languages: self.languages.clone(),
            proxy_pool: self.proxy_pool.clone(),
            cost_budget: self.cost_budget,
            timeout,
            provider_retry: false,
            render: RenderOptions {
                wait_for_selector: Some(self.wait_for_selector.clone()),
                rendering_wait: None,
                auto_scroll: false,
            },
        }
    }
}
