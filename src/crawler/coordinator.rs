//! First-pass fetch coordinator
//!
//! Fetches every catalog URL once with bounded concurrency:
//! - A semaphore caps in-flight fetches
//! - Each request gets its own session token and a hard timeout
//! - Each task paces itself with a random delay before giving up its slot
//! - Tasks hand their observation back through their join handle
//!
//! There are no retries here. Anything that did not reach a terminal
//! classification is picked up by the retry pass.

use crate::config::FirstPassConfig;
use crate::crawler::classifier::attempt;
use crate::crawler::parser::FieldExtractor;
use crate::crawler::provider::{FetchProvider, RequestProfile};
use crate::observation::{ObservationRecord, Stage};
use crate::SweepError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;

/// Runs the first pass over a catalog
pub struct FetchCoordinator {
    provider: Arc<dyn FetchProvider>,
    extractor: Arc<dyn FieldExtractor>,
    profile: RequestProfile,
    config: FirstPassConfig,
}

impl FetchCoordinator {
    /// Creates a new coordinator
    ///
    /// # Arguments
    ///
    /// * `provider` - Fetch provider shared by all tasks
    /// * `extractor` - Field extractor for the product template
    /// * `profile` - Country, locale and proxy affinity for every request
    /// * `config` - Concurrency, timeout and pacing settings
    pub fn new(
        provider: Arc<dyn FetchProvider>,
        extractor: Arc<dyn FieldExtractor>,
        profile: RequestProfile,
        config: FirstPassConfig,
    ) -> Self {
        Self {
            provider,
            extractor,
            profile,
            config,
        }
    }

    /// Fetches every URL once
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ObservationRecord>)` - One `primary` observation per input
    ///   URL, in input order
    /// * `Err(SweepError::AttemptBoundary)` - A task panicked or was
    ///   cancelled instead of producing an observation
    pub async fn run(&self, urls: &[String]) -> Result<Vec<ObservationRecord>, SweepError> {
        let total = urls.len();
        if total == 0 {
            tracing::info!("First pass: catalog is empty, nothing to fetch");
            return Ok(Vec::new());
        }

        let max_concurrent = self.config.max_concurrent_fetches.max(1) as usize;
        tracing::info!(
            "First pass: fetching {} URLs with up to {} in flight",
            total,
            max_concurrent
        );

        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let completed = Arc::new(Mutex::new(0usize));
        let mut handles: Vec<(String, JoinHandle<ObservationRecord>)> = Vec::with_capacity(total);

        for url in urls {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    abort_all(&handles);
                    return Err(SweepError::AttemptBoundary {
                        url: url.clone(),
                        message: e.to_string(),
                    });
                }
            };

            let provider = Arc::clone(&self.provider);
            let extractor = Arc::clone(&self.extractor);
            let completed = Arc::clone(&completed);
            let request = self.profile.request(
                url,
                uuid::Uuid::new_v4().to_string(),
                self.config.request_timeout(),
            );
            let pacing = self.pacing_delay();

            let handle = tokio::spawn(async move {
                let record =
                    attempt(provider.as_ref(), extractor.as_ref(), &request, Stage::Primary).await;

                {
                    let mut done = completed.lock().await;
                    *done += 1;
                    tracing::info!("[{}/{}] {} -> {}", *done, total, record.url, record.status);
                }

                // Pacing happens while the slot is still held
                tokio::time::sleep(pacing).await;
                drop(permit);
                record
            });
            handles.push((url.clone(), handle));
        }

        let mut records = Vec::with_capacity(total);
        let mut pending = handles.into_iter();
        while let Some((url, handle)) = pending.next() {
            match handle.await {
                Ok(record) => records.push(record),
                Err(e) => {
                    let rest: Vec<_> = pending.collect();
                    abort_all(&rest);
                    tracing::error!("First pass task for {} did not complete: {}", url, e);
                    return Err(SweepError::AttemptBoundary {
                        url,
                        message: e.to_string(),
                    });
                }
            }
        }

        tracing::info!("First pass complete: {} observations", records.len());
        Ok(records)
    }

    fn pacing_delay(&self) -> Duration {
        let min = self.config.pacing_min_ms;
        let max = self.config.pacing_max_ms.max(min);
        Duration::from_millis(fastrand::u64(min..=max))
    }
}

fn abort_all(handles: &[(String, JoinHandle<ObservationRecord>)]) {
    for (_, handle) in handles {
        handle.abort();
    }
}
