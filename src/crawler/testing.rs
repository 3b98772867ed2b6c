//! Scripted provider and extractors shared by crawler unit tests

use crate::config::{ExtractionConfig, ProviderConfig};
use crate::crawler::parser::{ExtractedFields, FieldExtractor};
use crate::crawler::provider::{
    FetchError, FetchProvider, FetchRequest, FetchedPage, RequestProfile,
};
use crate::observation::ApiCost;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scripted response for one provider call
#[derive(Debug, Clone)]
pub enum Step {
    /// Page with a product title and a billed cost
    Titled(&'static str, f64),
    /// Page rendered without the product title
    Untitled(f64),
    /// Page carrying the unavailable marker
    Unavailable(f64),
    /// Provider error with the given code
    Error(&'static str),
    /// Never answers
    Hang,
}

pub fn page(cost: f64) -> FetchedPage {
    FetchedPage {
        content: String::new(),
        api_cost: ApiCost::Billed(cost),
    }
}

pub fn profile() -> RequestProfile {
    RequestProfile::from_config(&ProviderConfig::default(), &ExtractionConfig::default())
}

/// Provider that replays per-URL scripts and records every request
pub struct ScriptedProvider {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    fallback: Step,
    delay: Duration,
    calls: Mutex<Vec<FetchRequest>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            fallback: Step::Titled("Producto", 1.0),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn script(self, url: &str, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), steps.into());
        self
    }

    pub fn fallback(mut self, step: Step) -> Self {
        self.fallback = step;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<FetchRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, url: &str) -> Vec<FetchRequest> {
        self.calls().into_iter().filter(|c| c.url == url).collect()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FetchProvider for ScriptedProvider {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedPage, FetchError> {
        self.calls.lock().unwrap().push(request.clone());
        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&request.url)
            .and_then(|steps| steps.pop_front())
            .unwrap_or_else(|| self.fallback.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match step {
            Step::Titled(title, cost) => Ok(FetchedPage {
                content: format!("title:{}", title),
                api_cost: ApiCost::Billed(cost),
            }),
            Step::Untitled(cost) => Ok(page(cost)),
            Step::Unavailable(cost) => Ok(FetchedPage {
                content: "unavailable".to_string(),
                api_cost: ApiCost::Billed(cost),
            }),
            Step::Error(code) => Err(FetchError::Provider {
                code: Some(code.to_string()),
                message: "scripted failure".to_string(),
            }),
            Step::Hang => std::future::pending().await,
        }
    }
}

/// Reads the markers written by `ScriptedProvider`
pub struct MarkerExtractor;

impl FieldExtractor for MarkerExtractor {
    fn is_unavailable(&self, content: &str) -> bool {
        content == "unavailable"
    }

    fn extract(&self, content: &str) -> ExtractedFields {
        ExtractedFields {
            title: content.strip_prefix("title:").map(str::to_string),
            price: Some("1.500".to_string()),
            ..ExtractedFields::default()
        }
    }
}

/// Extractor returning the same answer for any content
pub struct FixedExtractor {
    fields: ExtractedFields,
    unavailable: bool,
}

impl FixedExtractor {
    pub fn titled(title: &str) -> Self {
        Self::with_fields(ExtractedFields {
            title: Some(title.to_string()),
            ..ExtractedFields::default()
        })
    }

    pub fn with_fields(fields: ExtractedFields) -> Self {
        Self {
            fields,
            unavailable: false,
        }
    }

    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }
}

impl FieldExtractor for FixedExtractor {
    fn is_unavailable(&self, _content: &str) -> bool {
        self.unavailable
    }

    fn extract(&self, _content: &str) -> ExtractedFields {
        self.fields.clone()
    }
}
