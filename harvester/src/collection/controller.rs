//! The resumable collection state machine.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::config::{CollectionRequest, GrowthWaitConfig};
use super::growth::{wait_for_growth, GrowthOutcome};
use super::session::{CollectionSession, HarvestStats};
use super::surface::{Continuation, Extractor, PageSurface};
use crate::cancellation::CancellationToken;
use crate::checkpoint::{Checkpoint, CheckpointPolicy, CheckpointStore};
use crate::config::HarvestConfig;
use crate::errors::{CheckpointError, HarvestError};
use crate::events::{NoOpProgressSink, ProgressEvent, ProgressSink, ProgressStep};
use crate::observability::SummaryEmitter;
use crate::record::Record;
use crate::utils::now_utc;

/// Why a run ended. None of these is an error: every variant carries
/// whatever was collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The quota was met.
    Success,
    /// No usable continuation control was found.
    Exhausted,
    /// The iteration cap was reached.
    Capped,
    /// A scrolling run stopped producing new records.
    Stalled,
    /// The caller requested early termination.
    Cancelled,
    /// A host or storage failure ended the run early.
    Aborted(String),
}

impl Termination {
    /// Returns true for [`Termination::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Exhausted => write!(f, "exhausted"),
            Self::Capped => write!(f, "capped"),
            Self::Stalled => write!(f, "stalled"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Aborted(reason) => write!(f, "aborted: {reason}"),
        }
    }
}

/// Result of a finished run.
#[derive(Debug, Clone)]
pub struct CollectionReport {
    /// The request the run belonged to.
    pub request_id: String,
    /// Why the run ended.
    pub termination: Termination,
    /// Collected records in discovery order, at most `quota`.
    pub records: Vec<Record>,
    /// The iteration the run ended on.
    pub iterations: usize,
    /// Caller state carried through the checkpoint.
    pub context: serde_json::Value,
}

/// What a call to the controller produced.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The run terminated and its checkpoint is gone.
    Finished(CollectionReport),
    /// A hard navigation was performed. The checkpoint holds the run; a new
    /// controller resumes it once the next page is loaded.
    Suspended {
        /// The request the run belongs to.
        request_id: String,
        /// Where the page is going.
        target_url: String,
        /// Records collected so far.
        collected: usize,
    },
}

impl RunOutcome {
    /// The report, if the run finished.
    #[must_use]
    pub fn into_report(self) -> Option<CollectionReport> {
        match self {
            Self::Finished(report) => Some(report),
            Self::Suspended { .. } => None,
        }
    }

    /// Returns true if the run is waiting on a navigation.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        matches!(self, Self::Suspended { .. })
    }
}

enum Step {
    Continue,
    Done(Termination),
    Suspend(String),
}

/// Drives a [`PageSurface`] toward a quota of unique records.
pub struct CollectionController<S, X> {
    surface: Arc<S>,
    extractor: X,
    checkpoints: Arc<dyn CheckpointStore>,
    growth: GrowthWaitConfig,
    policy: CheckpointPolicy,
    progress: Arc<dyn ProgressSink>,
    cancellation: Arc<CancellationToken>,
    summaries: SummaryEmitter,
}

impl<S, X> fmt::Debug for CollectionController<S, X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionController")
            .field("growth", &self.growth)
            .field("policy", &self.policy)
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<S, X> CollectionController<S, X>
where
    S: PageSurface,
    X: Extractor<S::Element>,
{
    /// Creates a controller with default timing, no progress reporting and
    /// its own cancellation token.
    pub fn new(surface: Arc<S>, extractor: X, checkpoints: Arc<dyn CheckpointStore>) -> Self {
        Self {
            surface,
            extractor,
            checkpoints,
            growth: GrowthWaitConfig::default(),
            policy: CheckpointPolicy::default(),
            progress: Arc::new(NoOpProgressSink),
            cancellation: Arc::new(CancellationToken::new()),
            summaries: SummaryEmitter::default(),
        }
    }

    /// Sets the growth-wait parameters.
    #[must_use]
    pub fn with_growth_wait(mut self, growth: GrowthWaitConfig) -> Self {
        self.growth = growth;
        self
    }

    /// Sets the checkpoint policy.
    #[must_use]
    pub fn with_checkpoint_policy(mut self, policy: CheckpointPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the progress sink.
    #[must_use]
    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    /// Applies the growth-wait and checkpoint settings of `config`.
    #[must_use]
    pub fn with_config(self, config: &HarvestConfig) -> Self {
        self.with_growth_wait(config.growth)
            .with_checkpoint_policy(config.checkpoint)
    }

    /// Shares a cancellation token with the caller.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancellation = token;
        self
    }

    /// The cancellation token observed by this controller.
    #[must_use]
    pub fn cancellation(&self) -> &Arc<CancellationToken> {
        &self.cancellation
    }

    /// Starts or resumes a run.
    ///
    /// A live checkpoint takes priority over `request` unless the request
    /// asks for a fresh start, in which case the checkpoint is discarded.
    /// Checkpoints older than the policy allows are discarded too.
    pub async fn run(&self, request: CollectionRequest) -> Result<RunOutcome, HarvestError> {
        request.validate()?;
        if request.fresh_start {
            self.checkpoints.clear().await?;
            info!(request_id = %request.request_id, "Fresh start requested, checkpoint cleared");
        } else if let Some(session) = self.load_session().await? {
            if session.request().request_id != request.request_id {
                info!(
                    checkpoint_request_id = %session.request().request_id,
                    request_id = %request.request_id,
                    "Checkpoint from another request takes priority"
                );
            }
            return Ok(self.drive(session).await);
        }
        Ok(self.drive(CollectionSession::new(request)).await)
    }

    /// Resumes the checkpointed run, if there is one.
    pub async fn resume(&self) -> Result<Option<RunOutcome>, HarvestError> {
        match self.load_session().await? {
            Some(session) => Ok(Some(self.drive(session).await)),
            None => Ok(None),
        }
    }

    /// Loads the live checkpoint.
    ///
    /// An unreadable or stale slot is cleared and reported as empty, so a
    /// bad document never blocks later runs. Storage failures are returned.
    pub async fn live_checkpoint(&self) -> Result<Option<Checkpoint>, HarvestError> {
        let checkpoint = match self.checkpoints.load().await {
            Ok(Some(checkpoint)) => checkpoint,
            Ok(None) => return Ok(None),
            Err(CheckpointError::Serialization(e)) => {
                warn!(error = %e, "Discarding unreadable checkpoint");
                self.checkpoints.clear().await?;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        if self.policy.is_stale(&checkpoint, &now_utc()) {
            warn!(
                request_id = %checkpoint.request_id,
                saved_at = %checkpoint.last_saved(),
                "Discarding stale checkpoint"
            );
            self.checkpoints.clear().await?;
            return Ok(None);
        }
        Ok(Some(checkpoint))
    }

    async fn load_session(&self) -> Result<Option<CollectionSession>, HarvestError> {
        let Some(checkpoint) = self.live_checkpoint().await? else {
            return Ok(None);
        };
        info!(
            request_id = %checkpoint.request_id,
            iteration = checkpoint.current_page,
            collected = checkpoint.len(),
            "Resuming from checkpoint"
        );
        Ok(Some(CollectionSession::from_checkpoint(checkpoint)))
    }

    async fn drive(&self, mut session: CollectionSession) -> RunOutcome {
        loop {
            let step = match self.iterate(&mut session).await {
                Ok(step) => step,
                Err(e) => {
                    warn!(
                        request_id = %session.request().request_id,
                        iteration = session.iteration(),
                        error = %e,
                        "Iteration failed, ending run with partial results"
                    );
                    Step::Done(Termination::Aborted(e.to_string()))
                }
            };
            match step {
                Step::Continue => {}
                Step::Done(termination) => return self.finish(session, termination).await,
                Step::Suspend(target_url) => {
                    self.progress
                        .emit(ProgressEvent::ratio(
                            ProgressStep::LoadingList,
                            format!("Navigating to page {}", session.iteration()),
                            session.collected(),
                            session.request().quota,
                        ))
                        .await;
                    return RunOutcome::Suspended {
                        request_id: session.request().request_id.clone(),
                        target_url,
                        collected: session.collected(),
                    };
                }
            }
        }
    }

    async fn iterate(&self, session: &mut CollectionSession) -> anyhow::Result<Step> {
        if self.cancellation.is_cancelled() {
            return Ok(Step::Done(Termination::Cancelled));
        }

        let stats = self.harvest(session).await?;
        self.report_harvest(session, &stats).await;

        if session.quota_reached() {
            return Ok(Step::Done(Termination::Success));
        }
        let continuation = self
            .surface
            .find_continuation(&session.request().selector_config)
            .await?;
        let Some(continuation) = continuation.filter(|c| !c.disabled) else {
            return Ok(Step::Done(Termination::Exhausted));
        };
        if session.is_capped() {
            return Ok(Step::Done(Termination::Capped));
        }
        if session.is_stalled() {
            return Ok(Step::Done(Termination::Stalled));
        }

        self.advance(session, continuation).await
    }

    async fn harvest(&self, session: &mut CollectionSession) -> anyhow::Result<HarvestStats> {
        let elements = self.surface.candidates().await?;
        let config = &session.request().selector_config;
        let records: Vec<Record> = elements
            .iter()
            .filter_map(|el| self.extractor.extract(el, config))
            .collect();
        let base = self.surface.address();
        Ok(session.merge_harvest(elements.len(), records, base.as_deref()))
    }

    async fn report_harvest(&self, session: &CollectionSession, stats: &HarvestStats) {
        let request = session.request();
        if session.iteration() == 1 {
            info!(
                request_id = %request.request_id,
                candidates = stats.candidates,
                added = stats.added,
                "First page harvested"
            );
        }
        debug!(
            request_id = %request.request_id,
            iteration = session.iteration(),
            added = stats.added,
            duplicates = stats.duplicates,
            rejected = stats.rejected,
            collected = session.collected(),
            quota = request.quota,
            "Harvest complete"
        );
        self.progress
            .emit(ProgressEvent::ratio(
                ProgressStep::LoadingList,
                format!(
                    "Iteration {}: {} of {} collected",
                    session.iteration(),
                    session.collected(),
                    request.quota
                ),
                session.collected(),
                request.quota,
            ))
            .await;
    }

    async fn advance(
        &self,
        session: &mut CollectionSession,
        continuation: Continuation,
    ) -> anyhow::Result<Step> {
        session.advance();
        self.checkpoints.save(&session.to_checkpoint()).await?;

        if let Some(target_url) = continuation.target_url {
            debug!(target_url = %target_url, iteration = session.iteration(), "Navigating");
            self.surface.navigate(&target_url).await?;
            return Ok(Step::Suspend(target_url));
        }

        let before = self.surface.candidate_count().await?;
        let before_address = self.surface.address();
        self.surface.trigger(&continuation).await?;

        let outcome = wait_for_growth(
            self.surface.as_ref(),
            before,
            before_address.as_deref(),
            &self.growth,
            &self.cancellation,
        )
        .await?;
        if outcome == GrowthOutcome::TimedOut {
            warn!(
                request_id = %session.request().request_id,
                iteration = session.iteration(),
                "No growth after trigger, proceeding anyway"
            );
        }

        // Cancellation during either wait is picked up at the top of the next iteration.
        if outcome != GrowthOutcome::Cancelled {
            self.cancellation
                .sleep(session.request().inter_iteration_delay())
                .await;
        }
        Ok(Step::Continue)
    }

    async fn finish(&self, session: CollectionSession, termination: Termination) -> RunOutcome {
        if let Err(e) = self.checkpoints.clear().await {
            warn!(
                request_id = %session.request().request_id,
                error = %e,
                "Failed to clear checkpoint"
            );
        }

        let request_id = session.request().request_id.clone();
        let context = session.request().context.clone();
        let quota = session.request().quota;
        let iterations = session.iteration();
        let records = session.into_records();

        self.progress
            .emit(ProgressEvent::new(
                ProgressStep::LoadingList,
                format!("Collection {termination}: {} records", records.len()),
                100,
            ))
            .await;

        let report = CollectionReport {
            request_id,
            termination,
            records,
            iterations,
            context,
        };
        self.summaries.emit_collection(&report, quota);
        RunOutcome::Finished(report)
    }
}
