//! Product page field extraction
//!
//! This module reads rendered product pages:
//! - Detecting the "item no longer available" marker
//! - Extracting title, price, competitor, installments and image URL
//!
//! Each field is looked up independently. A missing element or an element
//! with only whitespace counts as a miss for that field alone.

use crate::config::ExtractionConfig;
use crate::ConfigError;
use scraper::{Html, Selector};

/// Raw field values read from a page, `None` where extraction missed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub title: Option<String>,
    pub price: Option<String>,
    pub competitor: Option<String>,
    pub installments_text: Option<String>,
    pub image_url: Option<String>,
}

/// Reads product fields out of page content
pub trait FieldExtractor: Send + Sync {
    /// Returns true when the page says the item is no longer offered
    fn is_unavailable(&self, content: &str) -> bool;

    /// Extracts the product fields
    fn extract(&self, content: &str) -> ExtractedFields;
}

/// CSS selector based extractor for the marketplace product template
pub struct HtmlExtractor {
    title: Selector,
    price: Selector,
    competitor: Selector,
    installments: Selector,
    image: Selector,
    unavailable: Selector,
    unavailable_phrase: String,
}

impl HtmlExtractor {
    /// Compiles the configured selectors
    ///
    /// # Arguments
    ///
    /// * `config` - The extraction section of the configuration
    ///
    /// # Returns
    ///
    /// * `Ok(HtmlExtractor)` - All selectors compiled
    /// * `Err(ConfigError::InvalidSelector)` - A selector did not parse
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            title: compile("title-selector", &config.title_selector)?,
            price: compile("price-selector", &config.price_selector)?,
            competitor: compile("competitor-selector", &config.competitor_selector)?,
            installments: compile("installments-selector", &config.installments_selector)?,
            image: compile("image-selector", &config.image_selector)?,
            unavailable: compile("unavailable-selector", &config.unavailable_selector)?,
            unavailable_phrase: collapse_text(std::iter::once(config.unavailable_phrase.as_str())),
        })
    }
}

impl FieldExtractor for HtmlExtractor {
    fn is_unavailable(&self, content: &str) -> bool {
        let document = Html::parse_document(content);

        document
            .select(&self.unavailable)
            .any(|element| collapse_text(element.text()).contains(&self.unavailable_phrase))
    }

    fn extract(&self, content: &str) -> ExtractedFields {
        let document = Html::parse_document(content);

        ExtractedFields {
            title: first_text(&document, &self.title),
            price: first_text(&document, &self.price),
            competitor: first_text(&document, &self.competitor),
            installments_text: first_text(&document, &self.installments),
            image_url: document
                .select(&self.image)
                .filter_map(|element| element.value().attr("src"))
                .map(str::trim)
                .find(|src| !src.is_empty())
                .map(str::to_string),
        }
    }
}

fn compile(field: &str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector {
        field: field.to_string(),
        selector: selector.to_string(),
    })
}

/// Text of the first matching element with non-blank content
fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .map(|element| collapse_text(element.text()))
        .find(|text| !text.is_empty())
}

/// Joins text nodes and collapses runs of whitespace
fn collapse_text<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT_PAGE: &str = r#"
        <html><body>
          <h1 class="ui-pdp-title">Zapatilla Running  Pro
          </h1>
          <div class="ui-pdp-price__second-line">
            <span class="andes-money-amount__fraction">1.234</span>
          </div>
          <h2 class="ui-seller-data-header__title">Tienda Oficial</h2>
          <div class="ui-pdp-price__subtitles">Mismo precio en <span>6 cuotas</span></div>
          <figure><img class="ui-pdp-image" src="https://img.example.com/p.jpg"></figure>
        </body></html>
    "#;

    fn extractor() -> HtmlExtractor {
        HtmlExtractor::from_config(&ExtractionConfig::default()).unwrap()
    }

    #[test]
    fn test_extract_full_product_page() {
        let fields = extractor().extract(PRODUCT_PAGE);

        assert_eq!(fields.title.as_deref(), Some("Zapatilla Running Pro"));
        assert_eq!(fields.price.as_deref(), Some("1.234"));
        assert_eq!(fields.competitor.as_deref(), Some("Tienda Oficial"));
        assert_eq!(
            fields.installments_text.as_deref(),
            Some("Mismo precio en 6 cuotas")
        );
        assert_eq!(
            fields.image_url.as_deref(),
            Some("https://img.example.com/p.jpg")
        );
    }

    #[test]
    fn test_fields_miss_independently() {
        let html = r#"<html><body>
            <h1 class="ui-pdp-title">   </h1>
            <h2 class="ui-seller-data-header__title">Vendedor</h2>
            <img class="ui-pdp-image">
        </body></html>"#;
        let fields = extractor().extract(html);

        assert_eq!(fields.title, None);
        assert_eq!(fields.price, None);
        assert_eq!(fields.competitor.as_deref(), Some("Vendedor"));
        assert_eq!(fields.installments_text, None);
        assert_eq!(fields.image_url, None);
    }

    #[test]
    fn test_unavailable_marker() {
        let html = r#"<html><body>
            <h1 class="ui-pdp-title">Producto</h1>
            <p class="ui-pdp-shipping-message__text">
              Este producto no está disponible.   Elige otra variante.
            </p>
        </body></html>"#;
        let extractor = extractor();

        assert!(extractor.is_unavailable(html));
        assert!(!extractor.is_unavailable(PRODUCT_PAGE));
    }

    #[test]
    fn test_unavailable_phrase_with_irregular_spacing() {
        let config = ExtractionConfig {
            unavailable_phrase: "  no está\n   disponible ".to_string(),
            ..ExtractionConfig::default()
        };
        let extractor = HtmlExtractor::from_config(&config).unwrap();
        let html = r#"<html><body>
            <p class="ui-pdp-shipping-message__text">Este producto no   está disponible.</p>
        </body></html>"#;

        assert!(extractor.is_unavailable(html));
        assert!(!extractor.is_unavailable(PRODUCT_PAGE));
    }

    #[test]
    fn test_unavailable_phrase_elsewhere_is_ignored() {
        let html = r#"<html><body>
            <p>Este producto no está disponible. Elige otra variante.</p>
        </body></html>"#;
        assert!(!extractor().is_unavailable(html));
    }

    #[test]
    fn test_invalid_selector() {
        let config = ExtractionConfig {
            price_selector: "div[[".to_string(),
            ..ExtractionConfig::default()
        };
        let result = HtmlExtractor::from_config(&config);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidSelector { ref field, .. }) if field == "price-selector"
        ));
    }

    #[test]
    fn test_non_html_content() {
        let fields = extractor().extract("{\"not\": \"html\"}");
        assert_eq!(fields, ExtractedFields::default());
    }
}
