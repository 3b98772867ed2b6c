//! Retry-pass escalation
//!
//! URLs that did not reach a terminal outcome in the first pass walk a fixed
//! ladder of increasingly expensive rendering configurations:
//!
//! ```text
//! first_attempt -> second_attempt -> heavy_retry -> rescue_pass -> deep_rescue
//! ```
//!
//! A URL stops climbing at its first `succeeded` or `discarded` observation.
//! URLs are processed one at a time with a fixed delay between them.

use crate::config::RetryPassConfig;
use crate::crawler::classifier::attempt;
use crate::crawler::parser::FieldExtractor;
use crate::crawler::provider::{FetchProvider, FetchRequest, RenderOptions, RequestProfile};
use crate::observation::{ObservationRecord, ObservationStatus, Stage};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Which session token a stage sends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPolicy {
    /// The token shared by the whole retry pass
    PassShared,
    /// A new token with the given prefix for every attempt
    Fresh(&'static str),
}

/// Rendering configuration for one escalation stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageConfig {
    pub stage: Stage,
    pub rendering_wait: Option<Duration>,
    pub auto_scroll: bool,
    pub session: SessionPolicy,

    /// Whether the provider waits for the product element
    pub wait_for_element: bool,
}

/// The five stage configurations in escalation order
pub fn escalation_plan() -> [StageConfig; 5] {
    [
        StageConfig {
            stage: Stage::FirstAttempt,
            rendering_wait: None,
            auto_scroll: false,
            session: SessionPolicy::PassShared,
            wait_for_element: true,
        },
        StageConfig {
            stage: Stage::SecondAttempt,
            rendering_wait: Some(Duration::from_secs(10)),
            auto_scroll: true,
            session: SessionPolicy::PassShared,
            wait_for_element: true,
        },
        StageConfig {
            stage: Stage::HeavyRetry,
            rendering_wait: Some(Duration::from_secs(12)),
            auto_scroll: true,
            session: SessionPolicy::Fresh("HEAVY"),
            wait_for_element: true,
        },
        StageConfig {
            stage: Stage::RescuePass,
            rendering_wait: Some(Duration::from_secs(15)),
            auto_scroll: true,
            session: SessionPolicy::Fresh("RESCUE"),
            wait_for_element: true,
        },
        StageConfig {
            stage: Stage::DeepRescue,
            rendering_wait: Some(Duration::from_secs(15)),
            auto_scroll: false,
            session: SessionPolicy::Fresh("DEEP"),
            wait_for_element: false,
        },
    ]
}

/// Looks up the configuration of an escalation stage
pub fn stage_config(stage: Stage) -> Option<StageConfig> {
    escalation_plan().into_iter().find(|c| c.stage == stage)
}

/// Where a URL stands on the ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationState {
    /// About to try the given stage
    Attempting(Stage),

    /// Reached a terminal outcome at the given stage
    Resolved(Stage),

    /// Every stage ran without a terminal outcome
    Exhausted,
}

impl EscalationState {
    pub fn initial() -> Self {
        Self::Attempting(Stage::FirstAttempt)
    }

    /// Applies the outcome of the current stage
    pub fn advance(self, status: ObservationStatus) -> Self {
        match self {
            Self::Attempting(stage) if status.is_terminal() => Self::Resolved(stage),
            Self::Attempting(stage) => match stage.next_escalation() {
                Some(next) => Self::Attempting(next),
                None => Self::Exhausted,
            },
            done => done,
        }
    }

    pub fn is_done(&self) -> bool {
        !matches!(self, Self::Attempting(_))
    }
}

impl fmt::Display for EscalationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attempting(stage) => write!(f, "attempting {}", stage),
            Self::Resolved(stage) => write!(f, "resolved at {}", stage),
            Self::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Everything the ladder produced for one URL
#[derive(Debug, Clone)]
pub struct EscalationOutcome {
    pub url: String,

    /// One observation per stage tried, in stage order
    pub observations: Vec<ObservationRecord>,

    pub final_state: EscalationState,
}

/// Drives the retry pass
pub struct EscalationMachine {
    provider: Arc<dyn FetchProvider>,
    extractor: Arc<dyn FieldExtractor>,
    profile: RequestProfile,
    config: RetryPassConfig,
    plan: [StageConfig; 5],
    pass_session: String,
}

impl EscalationMachine {
    /// Creates a machine with a new pass-wide session token
    pub fn new(
        provider: Arc<dyn FetchProvider>,
        extractor: Arc<dyn FieldExtractor>,
        profile: RequestProfile,
        config: RetryPassConfig,
    ) -> Self {
        Self {
            provider,
            extractor,
            profile,
            config,
            plan: escalation_plan(),
            pass_session: format!("FAILED-{}", uuid::Uuid::new_v4()),
        }
    }

    pub fn pass_session(&self) -> &str {
        &self.pass_session
    }

    /// Escalates every URL in order, one at a time
    ///
    /// # Returns
    ///
    /// All observations of the pass, grouped by URL in input order and by
    /// stage within a URL.
    pub async fn run(&self, urls: &[String]) -> Vec<ObservationRecord> {
        if urls.is_empty() {
            tracing::info!("Retry pass: nothing to retry");
            return Vec::new();
        }

        tracing::info!(
            "Retry pass: escalating {} URLs (session {})",
            urls.len(),
            self.pass_session
        );

        let mut observations = Vec::new();
        let mut resolved = 0usize;

        for (index, url) in urls.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.inter_url_delay()).await;
            }

            let outcome = self.escalate(url).await;
            if matches!(outcome.final_state, EscalationState::Resolved(_)) {
                resolved += 1;
            }
            tracing::info!(
                "[{}/{}] {} {}",
                index + 1,
                urls.len(),
                url,
                outcome.final_state
            );
            observations.extend(outcome.observations);
        }

        tracing::info!(
            "Retry pass complete: {} of {} URLs resolved, {} attempts",
            resolved,
            urls.len(),
            observations.len()
        );
        observations
    }

    /// Walks one URL up the ladder until it resolves or runs out of stages
    pub async fn escalate(&self, url: &str) -> EscalationOutcome {
        let mut state = EscalationState::initial();
        let mut observations = Vec::new();

        while let EscalationState::Attempting(stage) = state {
            let Some(stage_config) = self.plan.iter().find(|c| c.stage == stage) else {
                break;
            };
            let request = self.build_request(url, stage_config);
            let record = attempt(
                self.provider.as_ref(),
                self.extractor.as_ref(),
                &request,
                stage,
            )
            .await;

            tracing::debug!("{} {} -> {}", stage, url, record.status);
            state = state.advance(record.status);
            observations.push(record);
        }

        EscalationOutcome {
            url: url.to_string(),
            observations,
            final_state: state,
        }
    }

    fn build_request(&self, url: &str, stage: &StageConfig) -> FetchRequest {
        let session = match stage.session {
            SessionPolicy::PassShared => self.pass_session.clone(),
            SessionPolicy::Fresh(prefix) => format!("{}-{}", prefix, uuid::Uuid::new_v4()),
        };

        let mut request = self
            .profile
            .request(url, session, self.config.request_timeout());
        request.provider_retry = true;
        request.render = RenderOptions {
            wait_for_selector: stage
                .wait_for_element
                .then(|| self.profile.wait_for_selector.clone()),
            rendering_wait: stage.rendering_wait,
            auto_scroll: stage.auto_scroll,
        };
        request
    }
}
