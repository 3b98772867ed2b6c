use serde::Deserialize;
use std::time::Duration;

/// Environment variable consulted when `provider.api-key` is absent
pub const API_KEY_ENV: &str = "SCRAPFLY_API_KEY";

/// Main configuration structure for Catalog-Sweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(rename = "first-pass", default)]
    pub first_pass: FirstPassConfig,
    #[serde(rename = "retry-pass", default)]
    pub retry_pass: RetryPassConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Fetch provider connection and request affinity
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the scrape API
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// API key; falls back to the SCRAPFLY_API_KEY environment variable
    #[serde(rename = "api-key", default)]
    pub api_key: Option<String>,

    /// Country the provider should fetch from (e.g. "ar")
    #[serde(default = "default_country")]
    pub country: String,

    /// Accept-Language preferences, most preferred first
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    #[serde(rename = "proxy-pool", default = "default_proxy_pool")]
    pub proxy_pool: String,

    /// Upper bound on provider credits a single attempt may spend
    #[serde(rename = "cost-budget", default = "default_cost_budget")]
    pub cost_budget: u32,
}

/// First pass (bounded concurrency) tuning
#[derive(Debug, Clone, Deserialize)]
pub struct FirstPassConfig {
    /// Maximum number of fetches in flight at once
    #[serde(rename = "max-concurrent-fetches", default = "default_max_concurrent")]
    pub max_concurrent_fetches: u32,

    /// Hard timeout for each request (milliseconds)
    #[serde(rename = "request-timeout-ms", default = "default_first_timeout")]
    pub request_timeout_ms: u64,

    /// Lower bound of the pacing delay after each fetch (milliseconds)
    #[serde(rename = "pacing-min-ms", default = "default_pacing_min")]
    pub pacing_min_ms: u64,

    /// Upper bound of the pacing delay after each fetch (milliseconds)
    #[serde(rename = "pacing-max-ms", default = "default_pacing_max")]
    pub pacing_max_ms: u64,
}

/// Retry pass (sequential escalation) tuning
#[derive(Debug, Clone, Deserialize)]
pub struct RetryPassConfig {
    /// Fixed delay between two escalated URLs (milliseconds)
    #[serde(rename = "inter-url-delay-ms", default = "default_inter_url_delay")]
    pub inter_url_delay_ms: u64,

    /// Client-side hard timeout for each stage request (milliseconds)
    #[serde(rename = "request-timeout-ms", default = "default_retry_timeout")]
    pub request_timeout_ms: u64,
}

/// CSS selectors for the product page template
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    #[serde(rename = "title-selector", default = "default_title_selector")]
    pub title_selector: String,

    #[serde(rename = "price-selector", default = "default_price_selector")]
    pub price_selector: String,

    #[serde(rename = "competitor-selector", default = "default_competitor_selector")]
    pub competitor_selector: String,

    #[serde(
        rename = "installments-selector",
        default = "default_installments_selector"
    )]
    pub installments_selector: String,

    #[serde(rename = "image-selector", default = "default_image_selector")]
    pub image_selector: String,

    /// Element whose text may carry the unavailable phrase
    #[serde(rename = "unavailable-selector", default = "default_unavailable_selector")]
    pub unavailable_selector: String,

    /// Text that marks an item as no longer available
    #[serde(rename = "unavailable-phrase", default = "default_unavailable_phrase")]
    pub unavailable_phrase: String,

    /// Element the provider waits for before returning a rendered page
    #[serde(rename = "wait-for-selector", default = "default_title_selector")]
    pub wait_for_selector: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database holding canonical records
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory holding the first-pass and retry-pass checkpoint files
    #[serde(rename = "checkpoint-dir")]
    pub checkpoint_dir: String,

    /// Optional path for a markdown run summary
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,
}

/// Catalog URL source
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfig {
    /// Inline catalog URLs
    #[serde(default)]
    pub urls: Vec<String>,

    /// File with one catalog URL per line
    #[serde(rename = "urls-file", default)]
    pub urls_file: Option<String>,
}

impl ProviderConfig {
    /// Resolves the API key from config or environment
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

impl FirstPassConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl RetryPassConfig {
    pub fn inter_url_delay(&self) -> Duration {
        Duration::from_millis(self.inter_url_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            country: default_country(),
            languages: default_languages(),
            proxy_pool: default_proxy_pool(),
            cost_budget: default_cost_budget(),
        }
    }
}

impl Default for FirstPassConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent(),
            request_timeout_ms: default_first_timeout(),
            pacing_min_ms: default_pacing_min(),
            pacing_max_ms: default_pacing_max(),
        }
    }
}

impl Default for RetryPassConfig {
    fn default() -> Self {
        Self {
            inter_url_delay_ms: default_inter_url_delay(),
            request_timeout_ms: default_retry_timeout(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            title_selector: default_title_selector(),
            price_selector: default_price_selector(),
            competitor_selector: default_competitor_selector(),
            installments_selector: default_installments_selector(),
            image_selector: default_image_selector(),
            unavailable_selector: default_unavailable_selector(),
            unavailable_phrase: default_unavailable_phrase(),
            wait_for_selector: default_title_selector(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.scrapfly.io".to_string()
}

fn default_country() -> String {
    "ar".to_string()
}

fn default_languages() -> Vec<String> {
    vec!["es-AR".to_string(), "es".to_string()]
}

fn default_proxy_pool() -> String {
    "public_residential_pool".to_string()
}

fn default_cost_budget() -> u32 {
    30
}

fn default_max_concurrent() -> u32 {
    5
}

fn default_first_timeout() -> u64 {
    90_000
}

fn default_pacing_min() -> u64 {
    1_500
}

fn default_pacing_max() -> u64 {
    3_500
}

fn default_inter_url_delay() -> u64 {
    800
}

fn default_retry_timeout() -> u64 {
    180_000
}

fn default_title_selector() -> String {
    "h1.ui-pdp-title".to_string()
}

fn default_price_selector() -> String {
    "div.ui-pdp-price__second-line span.andes-money-amount__fraction".to_string()
}

fn default_competitor_selector() -> String {
    "h2.ui-seller-data-header__title".to_string()
}

fn default_installments_selector() -> String {
    "div.ui-pdp-price__subtitles".to_string()
}

fn default_image_selector() -> String {
    "img.ui-pdp-image".to_string()
}

fn default_unavailable_selector() -> String {
    ".ui-pdp-shipping-message__text".to_string()
}

fn default_unavailable_phrase() -> String {
    "Este producto no está disponible. Elige otra variante.".to_string()
}
