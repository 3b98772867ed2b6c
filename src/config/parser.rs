use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Stored with every run so sweeps made under different settings can be told apart.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_minimal_config_uses_defaults() {
        let config_content = r#"
[provider]
api-key = "test-key"

[output]
database-path = "./sweep.db"
checkpoint-dir = "./checkpoints"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.provider.base_url, "https://api.scrapfly.io");
        assert_eq!(config.provider.country, "ar");
        assert_eq!(config.provider.languages, vec!["es-AR", "es"]);
        assert_eq!(config.first_pass.max_concurrent_fetches, 5);
        assert_eq!(config.first_pass.pacing_min_ms, 1_500);
        assert_eq!(config.first_pass.pacing_max_ms, 3_500);
        assert_eq!(config.retry_pass.inter_url_delay_ms, 800);
        assert_eq!(config.extraction.title_selector, "h1.ui-pdp-title");
        assert!(config.catalog.urls.is_empty());
        assert!(config.output.summary_path.is_none());
    }

    #[test]
    fn test_load_full_config() {
        let config_content = r#"
[provider]
base-url = "https://scrape.internal"
api-key = "test-key"
country = "br"
languages = ["pt-BR"]
proxy-pool = "public_datacenter_pool"
cost-budget = 10

[first-pass]
max-concurrent-fetches = 8
request-timeout-ms = 60000
pacing-min-ms = 100
pacing-max-ms = 200

[retry-pass]
inter-url-delay-ms = 50
request-timeout-ms = 120000

[extraction]
title-selector = "h1.title"
unavailable-phrase = "Agotado"

[output]
database-path = "./sweep.db"
checkpoint-dir = "./checkpoints"
summary-path = "./summary.md"

[catalog]
urls = ["https://shop.example.com/item-1"]
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.provider.country, "br");
        assert_eq!(config.provider.cost_budget, 10);
        assert_eq!(config.first_pass.max_concurrent_fetches, 8);
        assert_eq!(config.retry_pass.inter_url_delay_ms, 50);
        assert_eq!(config.extraction.title_selector, "h1.title");
        assert_eq!(config.extraction.unavailable_phrase, "Agotado");
        assert_eq!(config.catalog.urls.len(), 1);
        assert_eq!(config.output.summary_path.as_deref(), Some("./summary.md"));
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/sweep.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
[provider]
api-key = "test-key"

[first-pass]
max-concurrent-fetches = 0

[output]
database-path = "./sweep.db"
checkpoint-dir = "./checkpoints"
"#;

        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        assert_ne!(
            compute_config_hash(file1.path()).unwrap(),
            compute_config_hash(file2.path()).unwrap()
        );
    }
}
