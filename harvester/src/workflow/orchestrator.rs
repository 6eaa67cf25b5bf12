//! The list -> detail -> export run.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::detail::DetailSource;
use super::plan::{select_links, WorkflowRequest};
use crate::cancellation::CancellationToken;
use crate::checkpoint::{CheckpointPolicy, CheckpointStore};
use crate::codec::{write_files, ExportOptions, Exporter};
use crate::collection::{
    CollectionController, CollectionReport, Extractor, GrowthWaitConfig, PageSurface, RunOutcome,
    Termination,
};
use crate::config::HarvestConfig;
use crate::errors::{ExportError, HarvestError, WorkflowError};
use crate::events::{NoOpProgressSink, ProgressEvent, ProgressSink, ProgressStep};
use crate::observability::SummaryEmitter;
use crate::record::{Record, LINK_FIELD};

/// Where detail records are exported.
#[derive(Debug, Clone)]
pub struct ExportTarget {
    /// Output directory.
    pub dir: PathBuf,
    /// Export options; the skip offset is taken from the workflow request.
    pub options: ExportOptions,
}

/// A completed workflow.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowCompletion {
    /// List records collected.
    pub list_count: usize,
    /// Detail records fetched.
    pub detail_count: usize,
    /// Links selected for detail fetching.
    pub expected_detail_count: usize,
    /// The detail records, in link order.
    pub details: Vec<Record>,
    /// How the list collection ended.
    #[serde(skip)]
    pub list_termination: Option<Termination>,
    /// Files written, if an export target was configured.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<PathBuf>,
}

/// What a workflow call produced.
#[derive(Debug, Clone)]
pub enum WorkflowOutcome {
    /// Details were fetched (and exported, if configured).
    Completed(WorkflowCompletion),
    /// The list run navigated away; call [`Workflow::resume`] once the next
    /// page is loaded.
    Suspended {
        /// The request the run belongs to.
        request_id: String,
        /// Where the page is going.
        target_url: String,
        /// List records collected so far.
        collected: usize,
    },
}

impl WorkflowOutcome {
    /// The completion, if the workflow finished.
    #[must_use]
    pub fn into_completion(self) -> Option<WorkflowCompletion> {
        match self {
            Self::Completed(completion) => Some(completion),
            Self::Suspended { .. } => None,
        }
    }
}

/// Orchestrates list collection, detail fetching and export.
pub struct Workflow<S, X> {
    controller: CollectionController<S, X>,
    details: Arc<dyn DetailSource>,
    progress: Arc<dyn ProgressSink>,
    cancellation: Arc<CancellationToken>,
    export: Option<ExportTarget>,
}

impl<S, X> fmt::Debug for Workflow<S, X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("controller", &self.controller)
            .field("export", &self.export)
            .finish_non_exhaustive()
    }
}

impl<S, X> Workflow<S, X>
where
    S: PageSurface,
    X: Extractor<S::Element>,
{
    /// Creates a workflow over a list surface and a detail source.
    pub fn new(
        surface: Arc<S>,
        extractor: X,
        checkpoints: Arc<dyn CheckpointStore>,
        details: Arc<dyn DetailSource>,
    ) -> Self {
        let cancellation = Arc::new(CancellationToken::new());
        Self {
            controller: CollectionController::new(surface, extractor, checkpoints)
                .with_cancellation(Arc::clone(&cancellation)),
            details,
            progress: Arc::new(NoOpProgressSink),
            cancellation,
            export: None,
        }
    }

    /// Sets the progress sink for every phase.
    #[must_use]
    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.controller = self.controller.with_progress_sink(Arc::clone(&sink));
        self.progress = sink;
        self
    }

    /// Shares a cancellation token with the caller.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.controller = self.controller.with_cancellation(Arc::clone(&token));
        self.cancellation = token;
        self
    }

    /// Sets the growth-wait parameters of the list run.
    #[must_use]
    pub fn with_growth_wait(mut self, growth: GrowthWaitConfig) -> Self {
        self.controller = self.controller.with_growth_wait(growth);
        self
    }

    /// Sets the checkpoint policy of the list run.
    #[must_use]
    pub fn with_checkpoint_policy(mut self, policy: CheckpointPolicy) -> Self {
        self.controller = self.controller.with_checkpoint_policy(policy);
        self
    }

    /// Applies the growth-wait and checkpoint settings of `config`, and its
    /// export options to an export target set earlier.
    #[must_use]
    pub fn with_config(mut self, config: &HarvestConfig) -> Self {
        self.controller = self.controller.with_config(config);
        if let Some(target) = self.export.as_mut() {
            target.options = config.export.clone();
        }
        self
    }

    /// Exports detail records to `dir` when the workflow completes.
    #[must_use]
    pub fn with_export(mut self, dir: impl Into<PathBuf>, options: ExportOptions) -> Self {
        self.export = Some(ExportTarget {
            dir: dir.into(),
            options,
        });
        self
    }

    /// Starts a workflow.
    pub async fn run(&self, request: WorkflowRequest) -> Result<WorkflowOutcome, HarvestError> {
        info!(
            request_id = %request.request_id,
            skip = request.skip,
            limit = request.limit,
            strategy = %request.strategy,
            "Starting workflow"
        );
        self.progress
            .emit(ProgressEvent::new(
                ProgressStep::LoadingList,
                format!("Loading {} list items", request.max_products()),
                0,
            ))
            .await;
        let mut collection = request.collection_request()?;
        if !collection.fresh_start && self.foreign_checkpoint().await? {
            warn!(
                request_id = %request.request_id,
                "Saved checkpoint holds no workflow plan, starting fresh"
            );
            collection = collection.with_fresh_start(true);
        }
        let outcome = self.controller.run(collection).await?;
        self.continue_from(outcome).await
    }

    /// Resumes a workflow whose list run was suspended by a navigation.
    /// A checkpoint left by a plain collection run is not a workflow and is
    /// left in place.
    pub async fn resume(&self) -> Result<Option<WorkflowOutcome>, HarvestError> {
        if self.foreign_checkpoint().await? {
            info!("Saved checkpoint holds no workflow plan, nothing to resume");
            return Ok(None);
        }
        match self.controller.resume().await? {
            Some(outcome) => self.continue_from(outcome).await.map(Some),
            None => Ok(None),
        }
    }

    async fn foreign_checkpoint(&self) -> Result<bool, HarvestError> {
        Ok(self
            .controller
            .live_checkpoint()
            .await?
            .is_some_and(|checkpoint| WorkflowRequest::from_context(&checkpoint.context).is_none()))
    }

    async fn continue_from(&self, outcome: RunOutcome) -> Result<WorkflowOutcome, HarvestError> {
        let report = match outcome {
            RunOutcome::Finished(report) => report,
            RunOutcome::Suspended {
                request_id,
                target_url,
                collected,
            } => {
                return Ok(WorkflowOutcome::Suspended {
                    request_id,
                    target_url,
                    collected,
                })
            }
        };
        let plan = WorkflowRequest::from_context(&report.context).ok_or_else(|| {
            HarvestError::Config("checkpoint context does not hold a workflow plan".to_string())
        })?;
        self.complete(plan, report).await.map(WorkflowOutcome::Completed)
    }

    async fn complete(
        &self,
        plan: WorkflowRequest,
        report: CollectionReport,
    ) -> Result<WorkflowCompletion, HarvestError> {
        if let Termination::Aborted(reason) = &report.termination {
            if report.records.is_empty() {
                return Err(WorkflowError::Collection(reason.clone()).into());
            }
        }

        let (links, total) = select_links(&report.records, &plan);
        if links.is_empty() {
            return Err(WorkflowError::NoLinksAfterSkip {
                skip: plan.skip,
                total,
            }
            .into());
        }
        info!(
            request_id = %plan.request_id,
            list_count = report.records.len(),
            selected = links.len(),
            termination = %report.termination,
            "List loaded, fetching details"
        );

        let details = self.fetch_details(&plan, &links).await;
        let files = self.export_details(&plan, &details).await?;

        let completion = WorkflowCompletion {
            list_count: report.records.len(),
            detail_count: details.len(),
            expected_detail_count: links.len(),
            details,
            list_termination: Some(report.termination),
            files,
        };
        SummaryEmitter::default().emit_workflow(&plan.request_id, &completion);
        self.progress
            .emit(ProgressEvent::new(
                ProgressStep::Done,
                format!(
                    "Scraped {} of {} items",
                    completion.detail_count, completion.expected_detail_count
                ),
                100,
            ))
            .await;
        Ok(completion)
    }

    async fn fetch_details(&self, plan: &WorkflowRequest, links: &[String]) -> Vec<Record> {
        let delay = Duration::from_millis(plan.detail_delay_ms);
        let mut details = Vec::with_capacity(links.len());

        for (i, link) in links.iter().enumerate() {
            if self.cancellation.is_cancelled() {
                break;
            }
            if i > 0 && !self.cancellation.sleep(delay).await {
                break;
            }

            match self.details.fetch(link).await {
                Ok(Some(mut record)) => {
                    if record.link().is_none() {
                        record.insert(LINK_FIELD, link.as_str());
                    }
                    details.push(record);
                }
                Ok(None) => debug!(link = %link, "Detail page yielded nothing, skipping"),
                Err(e) => warn!(link = %link, error = %e, "Detail fetch failed, skipping"),
            }

            self.progress
                .emit(ProgressEvent::ratio(
                    ProgressStep::ScrapingDetails,
                    format!("Scraped {} of {} details", i + 1, links.len()),
                    i + 1,
                    links.len(),
                ))
                .await;
        }
        details
    }

    async fn export_details(
        &self,
        plan: &WorkflowRequest,
        details: &[Record],
    ) -> Result<Vec<PathBuf>, HarvestError> {
        let Some(target) = &self.export else {
            return Ok(Vec::new());
        };
        self.progress
            .emit(ProgressEvent::new(
                ProgressStep::Exporting,
                format!("Exporting {} records", details.len()),
                0,
            ))
            .await;

        let exporter = Exporter::new(target.options.clone().with_skip_offset(plan.skip));
        let files = match exporter.export_records(details) {
            Ok(files) => files,
            Err(ExportError::EmptyBatch) => {
                warn!(request_id = %plan.request_id, "No detail records to export");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        let paths = write_files(&files, &target.dir).await?;
        info!(
            request_id = %plan.request_id,
            files = paths.len(),
            dir = %target.dir.display(),
            "Details exported"
        );
        Ok(paths)
    }
}
