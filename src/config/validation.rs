use crate::config::types::{
    CatalogConfig, Config, ExtractionConfig, FirstPassConfig, OutputConfig, ProviderConfig,
    RetryPassConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_provider_config(&config.provider)?;
    validate_first_pass_config(&config.first_pass)?;
    validate_retry_pass_config(&config.retry_pass)?;
    validate_extraction_config(&config.extraction)?;
    validate_output_config(&config.output)?;
    validate_catalog_config(&config.catalog)?;
    Ok(())
}

/// Validates provider configuration
fn validate_provider_config(config: &ProviderConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;
    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            config.base_url
        )));
    }

    if config.country.len() != 2 || !config.country.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ConfigError::Validation(format!(
            "country must be a two-letter code, got '{}'",
            config.country
        )));
    }

    if config.languages.is_empty() {
        return Err(ConfigError::Validation(
            "languages must list at least one locale".to_string(),
        ));
    }

    if config.proxy_pool.is_empty() {
        return Err(ConfigError::Validation(
            "proxy-pool cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates first pass tuning
fn validate_first_pass_config(config: &FirstPassConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-fetches must be between 1 and 100, got {}",
            config.max_concurrent_fetches
        )));
    }

    if config.request_timeout_ms < 1_000 {
        return Err(ConfigError::Validation(format!(
            "first-pass request-timeout-ms must be >= 1000ms, got {}ms",
            config.request_timeout_ms
        )));
    }

    if config.pacing_min_ms > config.pacing_max_ms {
        return Err(ConfigError::Validation(format!(
            "pacing-min-ms ({}) cannot exceed pacing-max-ms ({})",
            config.pacing_min_ms, config.pacing_max_ms
        )));
    }

    Ok(())
}

/// Validates retry pass tuning
fn validate_retry_pass_config(config: &RetryPassConfig) -> Result<(), ConfigError> {
    if config.request_timeout_ms < 1_000 {
        return Err(ConfigError::Validation(format!(
            "retry-pass request-timeout-ms must be >= 1000ms, got {}ms",
            config.request_timeout_ms
        )));
    }
    Ok(())
}

/// Validates that every configured selector parses
fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    for (field, selector) in [
        ("title-selector", &config.title_selector),
        ("price-selector", &config.price_selector),
        ("competitor-selector", &config.competitor_selector),
        ("installments-selector", &config.installments_selector),
        ("image-selector", &config.image_selector),
        ("unavailable-selector", &config.unavailable_selector),
        ("wait-for-selector", &config.wait_for_selector),
    ] {
        if Selector::parse(selector).is_err() {
            return Err(ConfigError::InvalidSelector {
                field: field.to_string(),
                selector: selector.clone(),
            });
        }
    }

    if config.unavailable_phrase.trim().is_empty() {
        return Err(ConfigError::Validation(
            "unavailable-phrase cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if config.checkpoint_dir.is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint-dir cannot be empty".to_string(),
        ));
    }

    if matches!(&config.summary_path, Some(p) if p.is_empty()) {
        return Err(ConfigError::Validation(
            "summary-path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates inline catalog URLs
fn validate_catalog_config(config: &CatalogConfig) -> Result<(), ConfigError> {
    for url in &config.urls {
        validate_catalog_url(url)?;
    }
    Ok(())
}

/// Validates a single catalog URL: must parse and use http(s)
pub fn validate_catalog_url(raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid catalog URL '{}': {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Catalog URL '{}' must use http or https",
            raw
        )));
    }

    Ok(())
}
