//! Attempt classification
//!
//! Turns the outcome of one provider call into exactly one
//! `ObservationRecord`. Classification never fails: provider errors,
//! timeouts and malformed payloads all land in a `provider_error` record.

use crate::crawler::parser::FieldExtractor;
use crate::crawler::provider::{FetchError, FetchProvider, FetchRequest, FetchedPage};
use crate::observation::{
    ApiCost, ObservationRecord, ObservationStatus, ProductFields, Stage, UNKNOWN_FIELD,
};
use chrono::{DateTime, Utc};

/// Failure reason for a page that rendered without a product title
pub const TITLE_NOT_FOUND: &str = "title_not_found";

/// Classifies a single fetch outcome
///
/// # Arguments
///
/// * `url` - The catalog URL that was fetched
/// * `stage` - Pass or escalation stage the attempt belongs to
/// * `outcome` - What the provider returned
/// * `extractor` - Field extractor for the product template
/// * `completed_at` - When the attempt finished
pub fn classify(
    url: &str,
    stage: Stage,
    outcome: Result<FetchedPage, FetchError>,
    extractor: &dyn FieldExtractor,
    completed_at: DateTime<Utc>,
) -> ObservationRecord {
    let page = match outcome {
        Ok(page) => page,
        Err(error) => {
            return ObservationRecord {
                url: url.to_string(),
                timestamp: completed_at,
                status: ObservationStatus::ProviderError,
                fields: ProductFields::unknown(),
                api_cost: ApiCost::Unknown,
                stage,
                failure_reason: Some(error.reason_code()),
            };
        }
    };

    if extractor.is_unavailable(&page.content) {
        return ObservationRecord {
            url: url.to_string(),
            timestamp: completed_at,
            status: ObservationStatus::Discarded,
            fields: ProductFields::unknown(),
            api_cost: page.api_cost,
            stage,
            failure_reason: None,
        };
    }

    let extracted = extractor.extract(&page.content);
    let unknown = || UNKNOWN_FIELD.to_string();
    let fields = ProductFields {
        title: extracted.title.unwrap_or_else(unknown),
        price: extracted.price.unwrap_or_default(),
        competitor: extracted.competitor.unwrap_or_else(unknown),
        installments_text: extracted.installments_text.unwrap_or_else(unknown),
        image_url: extracted.image_url.unwrap_or_else(unknown),
    };

    let (status, failure_reason) = if fields.has_title() {
        (ObservationStatus::Succeeded, None)
    } else {
        (ObservationStatus::Failed, Some(TITLE_NOT_FOUND.to_string()))
    };

    ObservationRecord {
        url: url.to_string(),
        timestamp: completed_at,
        status,
        fields,
        api_cost: page.api_cost,
        stage,
        failure_reason,
    }
}

/// Performs one bounded attempt and classifies it
///
/// The provider call is capped by `request.timeout` on the client side, so a
/// hung provider still yields an observation.
pub async fn attempt(
    provider: &dyn FetchProvider,
    extractor: &dyn FieldExtractor,
    request: &FetchRequest,
    stage: Stage,
) -> ObservationRecord {
    let outcome = match tokio::time::timeout(request.timeout, provider.fetch(request)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(request.timeout)),
    };

    if let Err(e) = &outcome {
        tracing::debug!("{} attempt for {} failed: {}", stage, request.url, e);
    }

    classify(&request.url, stage, outcome, extractor, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::parser::ExtractedFields;
    use crate::crawler::testing::{page, FixedExtractor, ScriptedProvider, Step};
    use std::time::Duration;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn test_provider_error_keeps_code() {
        let record = classify(
            "https://shop.example.com/a",
            Stage::Primary,
            Err(FetchError::Provider {
                code: Some("ERR::PROXY::TIMEOUT".to_string()),
                message: "proxy".to_string(),
            }),
            &FixedExtractor::titled("unused"),
            now(),
        );

        assert_eq!(record.status, ObservationStatus::ProviderError);
        assert_eq!(record.failure_reason.as_deref(), Some("ERR::PROXY::TIMEOUT"));
        assert_eq!(record.api_cost, ApiCost::Unknown);
        assert_eq!(record.fields, ProductFields::unknown());
    }

    #[test]
    fn test_unexpected_error_tag() {
        let record = classify(
            "https://shop.example.com/a",
            Stage::HeavyRetry,
            Err(FetchError::Unexpected("bad payload".to_string())),
            &FixedExtractor::titled("unused"),
            now(),
        );
        assert_eq!(record.failure_reason.as_deref(), Some("unexpected_error"));
        assert_eq!(record.stage, Stage::HeavyRetry);
    }

    #[test]
    fn test_unavailable_wins_over_fields() {
        let extractor = FixedExtractor::titled("Producto").unavailable();
        let record = classify(
            "https://shop.example.com/a",
            Stage::Primary,
            Ok(page(0.5)),
            &extractor,
            now(),
        );

        assert_eq!(record.status, ObservationStatus::Discarded);
        assert_eq!(record.api_cost, ApiCost::Billed(0.5));
        assert!(record.failure_reason.is_none());
    }

    #[test]
    fn test_missing_title_fails() {
        let extractor = FixedExtractor::with_fields(ExtractedFields {
            price: Some("999".to_string()),
            ..ExtractedFields::default()
        });
        let record = classify(
            "https://shop.example.com/a",
            Stage::Primary,
            Ok(page(1.0)),
            &extractor,
            now(),
        );

        assert_eq!(record.status, ObservationStatus::Failed);
        assert_eq!(record.failure_reason.as_deref(), Some(TITLE_NOT_FOUND));
        assert_eq!(record.fields.price, "999");
        assert_eq!(record.fields.competitor, UNKNOWN_FIELD);
        assert_eq!(record.api_cost, ApiCost::Billed(1.0));
    }

    #[test]
    fn test_success_with_partial_fields() {
        let extractor = FixedExtractor::titled("Zapatilla");
        let record = classify(
            "https://shop.example.com/a",
            Stage::SecondAttempt,
            Ok(page(2.0)),
            &extractor,
            now(),
        );

        assert_eq!(record.status, ObservationStatus::Succeeded);
        assert_eq!(record.fields.title, "Zapatilla");
        assert_eq!(record.fields.price, "");
        assert_eq!(record.fields.image_url, UNKNOWN_FIELD);
        assert!(record.failure_reason.is_none());
    }

    #[tokio::test]
    async fn test_attempt_enforces_timeout() {
        let provider = ScriptedProvider::new()
            .script("https://shop.example.com/slow", vec![Step::Hang]);
        let extractor = FixedExtractor::titled("x");
        let profile = crate::crawler::testing::profile();
        let request = profile.request(
            "https://shop.example.com/slow",
            "s".to_string(),
            Duration::from_millis(50),
        );

        let record = attempt(&provider, &extractor, &request, Stage::Primary).await;

        assert_eq!(record.status, ObservationStatus::ProviderError);
        assert_eq!(record.failure_reason.as_deref(), Some("timeout"));
    }
}
