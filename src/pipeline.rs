//! Sweep pipeline
//!
//! Wires the passes together for one run:
//!
//! ```text
//! notify -> first pass -> checkpoint -> retry pass -> checkpoint
//!        -> budget -> reconcile -> store -> summary -> notify
//! ```
//!
//! Each pass reads its input back from the persisted checkpoint of the pass
//! before it, so a run can resume at any phase boundary.

use crate::checkpoint::{pending_retry_urls, CheckpointStore, PassKind};
use crate::config::Config;
use crate::crawler::{
    BudgetReport, BudgetSource, EscalationMachine, FetchCoordinator, FetchProvider,
    FieldExtractor, HtmlExtractor, RequestProfile, ScrapflyProvider,
};
use crate::output::{write_markdown_summary, SweepStatistics, SweepSummary};
use crate::reconcile::{reconcile, CanonicalRecord};
use crate::storage::{CanonicalStore, RunStatus, SqliteStorage};
use crate::{ConfigError, SweepError};
use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Phase a run starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StartPhase {
    FirstPass,
    RetryPass,
    Reconcile,
}

impl fmt::Display for StartPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartPhase::FirstPass => write!(f, "first-pass"),
            StartPhase::RetryPass => write!(f, "retry-pass"),
            StartPhase::Reconcile => write!(f, "reconcile"),
        }
    }
}

/// Receives run status messages
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str);
}

/// Notifier that writes status messages to the log
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) {
        for line in message.lines() {
            tracing::info!("{}", line);
        }
    }
}

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: i64,
    pub start: StartPhase,
    pub catalog_size: usize,
    pub first_pass_observations: usize,
    pub retried_urls: usize,
    pub retry_observations: usize,
    pub canonical: Vec<CanonicalRecord>,
    pub statistics: SweepStatistics,
    pub budget: Option<BudgetReport>,
}

/// One configured sweep
pub struct Pipeline<S: CanonicalStore> {
    config: Config,
    config_hash: String,
    provider: Arc<dyn FetchProvider>,
    extractor: Arc<dyn FieldExtractor>,
    storage: S,
    checkpoints: CheckpointStore,
    budget: Option<Arc<dyn BudgetSource>>,
    notifier: Arc<dyn Notifier>,
}

impl Pipeline<SqliteStorage> {
    /// Builds the production pipeline: HTTP provider, HTML extractor and
    /// SQLite storage, all from configuration
    pub fn from_config(config: Config, config_hash: String) -> Result<Self, SweepError> {
        let api_key = config.provider.resolve_api_key().ok_or_else(|| {
            ConfigError::Validation(format!(
                "no provider API key: set provider.api-key or {}",
                crate::config::API_KEY_ENV
            ))
        })?;

        let provider = Arc::new(ScrapflyProvider::new(&config.provider.base_url, &api_key)?);
        let extractor = Arc::new(HtmlExtractor::from_config(&config.extraction)?);
        let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;

        Ok(Self::new(config, config_hash, provider.clone(), extractor, storage)
            .with_budget(provider))
    }
}

impl<S: CanonicalStore> Pipeline<S> {
    /// Creates a pipeline
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `config_hash` - Hash recorded with each run
    /// * `provider` - Fetch provider used by both passes
    /// * `extractor` - Field extractor for the product template
    /// * `storage` - Canonical record store
    pub fn new(
        config: Config,
        config_hash: String,
        provider: Arc<dyn FetchProvider>,
        extractor: Arc<dyn FieldExtractor>,
        storage: S,
    ) -> Self {
        let checkpoints = CheckpointStore::new(&config.output.checkpoint_dir);
        Self {
            config,
            config_hash,
            provider,
            extractor,
            storage,
            checkpoints,
            budget: None,
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_budget(mut self, budget: Arc<dyn BudgetSource>) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    /// Runs the sweep from the given phase
    ///
    /// # Arguments
    ///
    /// * `urls` - Catalog URLs; only the first pass reads them
    /// * `start` - Phase to start from; earlier phases are taken from their
    ///   checkpoints
    ///
    /// # Returns
    ///
    /// * `Ok(RunReport)` - The run completed and canonical records were stored
    /// * `Err(SweepError)` - The run failed and was marked as failed
    pub async fn run(&mut self, urls: &[String], start: StartPhase) -> Result<RunReport, SweepError> {
        self.notifier
            .notify(&format!(
                "Sweep starting from {}: {} catalog URLs",
                start,
                urls.len()
            ))
            .await;

        let run_id = self.storage.create_run(&self.config_hash)?;
        tracing::info!("Started run {}", run_id);

        match self.execute(run_id, urls, start).await {
            Ok(report) => {
                let message = match &report.budget {
                    Some(budget) => budget.status_line(),
                    None => "Sweep finished".to_string(),
                };
                self.notifier.notify(&message).await;
                Ok(report)
            }
            Err(e) => {
                tracing::error!("Run {} failed: {}", run_id, e);
                if let Err(mark) = self.storage.finish_run(run_id, RunStatus::Failed) {
                    tracing::warn!("Could not mark run {} as failed: {}", run_id, mark);
                }
                self.notifier
                    .notify(&format!("Sweep failed: {}", e))
                    .await;
                Err(e)
            }
        }
    }

    async fn execute(
        &mut self,
        run_id: i64,
        urls: &[String],
        start: StartPhase,
    ) -> Result<RunReport, SweepError> {
        let profile = RequestProfile::from_config(&self.config.provider, &self.config.extraction);

        if start <= StartPhase::FirstPass {
            let coordinator = FetchCoordinator::new(
                Arc::clone(&self.provider),
                Arc::clone(&self.extractor),
                profile.clone(),
                self.config.first_pass.clone(),
            );
            let observations = coordinator.run(urls).await?;
            self.checkpoints.write(PassKind::FirstPass, &observations)?;
        }

        let first_pass = self.checkpoints.read(PassKind::FirstPass)?;

        let retried = if start <= StartPhase::RetryPass {
            let pending = pending_retry_urls(&first_pass);
            let machine = EscalationMachine::new(
                Arc::clone(&self.provider),
                Arc::clone(&self.extractor),
                profile,
                self.config.retry_pass.clone(),
            );
            let observations = machine.run(&pending).await;
            // Written even when empty so an older retry checkpoint never merges
            self.checkpoints.write(PassKind::RetryPass, &observations)?;
            Some(pending.len())
        } else {
            None
        };

        let retry_pass = self.checkpoints.read(PassKind::RetryPass)?;
        let retried_urls = retried.unwrap_or_else(|| {
            retry_pass
                .iter()
                .map(|o| o.url.as_str())
                .collect::<HashSet<_>>()
                .len()
        });

        let budget = self.check_budget().await;

        let canonical = reconcile(&first_pass, &retry_pass);
        self.storage.upsert_canonical(run_id, &canonical)?;

        let observations = first_pass.len() + retry_pass.len();
        self.storage.record_run_counts(
            run_id,
            urls.len() as u64,
            retried_urls as u64,
            observations as u64,
        )?;
        self.storage.finish_run(run_id, RunStatus::Completed)?;

        let statistics = SweepStatistics::from_records(&canonical);
        tracing::info!(
            "Run {} stored {} canonical records from {} observations (cost {:.3})",
            run_id,
            canonical.len(),
            observations,
            statistics.total_cost
        );

        if let Some(path) = &self.config.output.summary_path {
            let run = self.storage.get_run(run_id)?;
            let summary = SweepSummary::new(&run, &canonical, budget.clone());
            write_markdown_summary(&summary, Path::new(path))?;
        }

        Ok(RunReport {
            run_id,
            start,
            catalog_size: urls.len(),
            first_pass_observations: first_pass.len(),
            retried_urls,
            retry_observations: retry_pass.len(),
            canonical,
            statistics,
            budget,
        })
    }

    /// Asks the budget source for remaining credits; failures are logged only
    async fn check_budget(&self) -> Option<BudgetReport> {
        let source = self.budget.as_ref()?;
        match source.remaining_budget().await {
            Ok(report) => {
                tracing::info!("Provider credits remaining: {}", report.remaining_credits);
                Some(report)
            }
            Err(e) => {
                tracing::warn!("Could not read provider budget: {}", e);
                None
            }
        }
    }
}
