//! HTTP fetch provider implementation
//!
//! This module talks to a Scrapfly-compatible scrape API:
//! - Building the HTTP client
//! - Translating a `FetchRequest` into scrape query parameters
//! - Reading page content and the per-attempt cost header
//! - Mapping provider and transport failures to `FetchError`
//! - Querying the account endpoint for remaining credits

use crate::crawler::provider::{
    BudgetReport, BudgetSource, FetchError, FetchProvider, FetchRequest, FetchedPage,
};
use crate::observation::ApiCost;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// Response header carrying the credits billed for a scrape
pub const API_COST_HEADER: &str = "X-Scrapfly-Api-Cost";

/// Builds the HTTP client used to reach the provider
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("catalog-sweep/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Scrape API client
pub struct ScrapflyProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ScrapeEnvelope {
    result: ScrapeResult,
}

#[derive(Debug, Deserialize)]
struct ScrapeResult {
    #[serde(default)]
    content: String,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<ProviderErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountEnvelope {
    subscription: Subscription,
}

#[derive(Debug, Deserialize)]
struct Subscription {
    usage: Usage,
    #[serde(default)]
    period: Option<Period>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    scrape: ScrapeUsage,
}

#[derive(Debug, Deserialize)]
struct ScrapeUsage {
    remaining: i64,
}

#[derive(Debug, Deserialize)]
struct Period {
    #[serde(default)]
    start: Option<String>,
    #[serde(default)]
    end: Option<String>,
}

impl ScrapflyProvider {
    /// Creates a provider client
    ///
    /// # Arguments
    ///
    /// * `base_url` - Root of the scrape API (no trailing path)
    /// * `api_key` - Account key sent with every call
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Query parameters for one scrape call
    fn scrape_params(&self, request: &FetchRequest) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("key", self.api_key.clone()),
            ("url", request.url.clone()),
            ("asp", "true".to_string()),
            ("render_js", "true".to_string()),
            ("country", request.country.clone()),
            ("lang", request.languages.join(",")),
            ("proxy_pool", request.proxy_pool.clone()),
            ("session", request.session.clone()),
            ("session_sticky_proxy", "true".to_string()),
            ("retry", request.provider_retry.to_string()),
            ("cost_budget", request.cost_budget.to_string()),
        ];

        // The provider rejects an explicit timeout when it is allowed to retry
        if !request.provider_retry {
            params.push(("timeout", request.timeout.as_millis().to_string()));
        }

        if let Some(selector) = &request.render.wait_for_selector {
            params.push(("wait_for_selector", selector.clone()));
        }
        if let Some(wait) = request.render.rendering_wait {
            params.push(("rendering_wait", wait.as_millis().to_string()));
        }
        if request.render.auto_scroll {
            params.push(("auto_scroll", "true".to_string()));
        }

        params
    }
}

#[async_trait]
impl FetchProvider for ScrapflyProvider {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(format!("{}/scrape", self.base_url))
            .query(&self.scrape_params(request))
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| classify_transport_error(e, request.timeout))?;

        let api_cost = ApiCost::from_header(
            response
                .headers()
                .get(API_COST_HEADER)
                .and_then(|v| v.to_str().ok()),
        );
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_transport_error(e, request.timeout))?;

        if !status.is_success() {
            return Err(provider_error(status, &body));
        }

        let envelope: ScrapeEnvelope = serde_json::from_str(&body)
            .map_err(|e| FetchError::Unexpected(format!("malformed scrape response: {}", e)))?;

        if envelope.result.success == Some(false) {
            let error = envelope.result.error;
            return Err(FetchError::Provider {
                code: error.as_ref().and_then(|e| e.code.clone()),
                message: error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| "scrape reported failure".to_string()),
            });
        }

        Ok(FetchedPage {
            content: envelope.result.content,
            api_cost,
        })
    }
}

#[async_trait]
impl BudgetSource for ScrapflyProvider {
    async fn remaining_budget(&self) -> Result<BudgetReport, FetchError> {
        let timeout = Duration::from_secs(30);
        let response = self
            .client
            .get(format!("{}/account", self.base_url))
            .query(&[("key", self.api_key.as_str())])
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_transport_error(e, timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_transport_error(e, timeout))?;

        if !status.is_success() {
            return Err(provider_error(status, &body));
        }

        let account: AccountEnvelope = serde_json::from_str(&body)
            .map_err(|e| FetchError::Unexpected(format!("malformed account response: {}", e)))?;
        let period = account.subscription.period;

        Ok(BudgetReport {
            remaining_credits: account.subscription.usage.scrape.remaining,
            period_start: period.as_ref().and_then(|p| p.start.clone()),
            period_end: period.and_then(|p| p.end),
        })
    }
}

/// Maps a non-2xx provider response to `FetchError::Provider`
fn provider_error(status: StatusCode, body: &str) -> FetchError {
    match serde_json::from_str::<ProviderErrorBody>(body) {
        Ok(parsed) => FetchError::Provider {
            code: parsed.code,
            message: parsed
                .message
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
        },
        Err(_) => FetchError::Provider {
            code: None,
            message: format!("HTTP {}", status.as_u16()),
        },
    }
}

/// Classifies a reqwest failure
fn classify_transport_error(error: reqwest::Error, timeout: Duration) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(timeout)
    } else if error.is_connect() || error.is_body() || error.is_request() {
        FetchError::Transport(error.to_string())
    } else {
        FetchError::Unexpected(error.to_string())
    }
}
