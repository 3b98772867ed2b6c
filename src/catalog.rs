//! Catalog URL source
//!
//! Supplies the ordered sequence of catalog URLs for a sweep. URLs come from
//! the inline `[catalog] urls` list followed by the lines of `urls-file`.
//! Order is preserved and duplicates are kept; deduplication belongs to
//! whoever curates the catalog.

use crate::config::{validate_catalog_url, CatalogConfig};
use crate::ConfigError;
use std::path::Path;

/// Loads the catalog URLs described by the configuration
///
/// # Arguments
///
/// * `config` - The catalog section of the configuration
///
/// # Returns
///
/// * `Ok(Vec<String>)` - Catalog URLs in source order, possibly empty
/// * `Err(ConfigError)` - The URL file could not be read or held an invalid URL
pub fn load_catalog_urls(config: &CatalogConfig) -> Result<Vec<String>, ConfigError> {
    let mut urls: Vec<String> = config.urls.iter().map(|u| u.trim().to_string()).collect();

    if let Some(file) = &config.urls_file {
        urls.extend(read_url_file(Path::new(file))?);
    }

    Ok(urls)
}

/// Reads one URL per line, skipping blank lines and `#` comments
fn read_url_file(path: &Path) -> Result<Vec<String>, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut urls = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        validate_catalog_url(line)?;
        urls.push(line.to_string());
    }

    tracing::debug!("Read {} catalog URLs from {}", urls.len(), path.display());
    Ok(urls)
}
