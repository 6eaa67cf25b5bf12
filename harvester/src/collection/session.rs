//! Explicit per-run collection state.

use tracing::trace;

use super::config::{CollectionRequest, Strategy, STALL_LIMIT};
use crate::checkpoint::Checkpoint;
use crate::record::{ItemStore, MergeOutcome, Record};
use crate::utils::{now_utc, Timestamp};

/// Counts from one harvest pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestStats {
    /// Candidate elements examined.
    pub candidates: usize,
    /// Records newly stored.
    pub added: usize,
    /// Records whose link was already stored.
    pub duplicates: usize,
    /// Elements the extractor skipped or the acceptance rules rejected.
    pub rejected: usize,
}

/// The state of one collection run.
///
/// Owned by the controller for the duration of a run and fully
/// reconstructible from a [`Checkpoint`].
#[derive(Debug, Clone)]
pub struct CollectionSession {
    request: CollectionRequest,
    store: ItemStore,
    iteration: usize,
    stall_count: usize,
    created_at: Timestamp,
}

impl CollectionSession {
    /// Starts a new run at iteration 1 with an empty store.
    #[must_use]
    pub fn new(request: CollectionRequest) -> Self {
        let store = ItemStore::with_capacity_limit(request.quota);
        Self {
            request,
            store,
            iteration: 1,
            stall_count: 0,
            created_at: now_utc(),
        }
    }

    /// Rebuilds a run from its checkpoint.
    #[must_use]
    pub fn from_checkpoint(checkpoint: Checkpoint) -> Self {
        let request = CollectionRequest {
            quota: checkpoint.target_quota,
            strategy: checkpoint.strategy,
            selector_config: checkpoint.selector_config,
            max_iterations: checkpoint.max_iterations,
            inter_iteration_delay_ms: checkpoint.inter_iteration_delay_ms,
            request_id: checkpoint.request_id,
            fresh_start: false,
            context: checkpoint.context,
            min_name_len: checkpoint.min_name_len,
        };
        let store = ItemStore::from_entries(checkpoint.entries, Some(request.quota));
        Self {
            request,
            store,
            iteration: checkpoint.current_page.max(1),
            stall_count: checkpoint.stall_count,
            created_at: checkpoint.created_at,
        }
    }

    /// Snapshots the run, stamping the snapshot with the current time.
    #[must_use]
    pub fn to_checkpoint(&self) -> Checkpoint {
        Checkpoint {
            entries: self.store.entries().to_vec(),
            current_page: self.iteration,
            target_quota: self.request.quota,
            selector_config: self.request.selector_config.clone(),
            request_id: self.request.request_id.clone(),
            created_at: self.created_at,
            saved_at: Some(now_utc()),
            strategy: self.request.strategy,
            max_iterations: self.request.max_iterations,
            inter_iteration_delay_ms: self.request.inter_iteration_delay_ms,
            stall_count: self.stall_count,
            min_name_len: self.request.min_name_len,
            context: self.request.context.clone(),
        }
    }

    /// The run's parameters.
    #[must_use]
    pub fn request(&self) -> &CollectionRequest {
        &self.request
    }

    /// The item store.
    #[must_use]
    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    /// The current (1-based) iteration.
    #[must_use]
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Consecutive zero-yield iterations so far.
    #[must_use]
    pub fn stall_count(&self) -> usize {
        self.stall_count
    }

    /// When the run started.
    #[must_use]
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Number of records collected.
    #[must_use]
    pub fn collected(&self) -> usize {
        self.store.len()
    }

    /// Returns true once the quota is met.
    #[must_use]
    pub fn quota_reached(&self) -> bool {
        self.store.len() >= self.request.quota
    }

    /// Returns true once a scrolling run has gone [`STALL_LIMIT`] iterations
    /// without adding anything. Paginated runs never stall.
    #[must_use]
    pub fn is_stalled(&self) -> bool {
        self.request.strategy == Strategy::Scrolling && self.stall_count >= STALL_LIMIT
    }

    /// Returns true once the iteration cap is reached.
    #[must_use]
    pub fn is_capped(&self) -> bool {
        self.iteration >= self.request.max_iterations
    }

    /// Merges one iteration's extracted records, in harvest order.
    ///
    /// `candidates` is the number of elements examined, of which `records`
    /// are the ones the extractor produced.
    pub fn merge_harvest(
        &mut self,
        candidates: usize,
        records: Vec<Record>,
        base: Option<&str>,
    ) -> HarvestStats {
        let policy = self.request.acceptance_policy();
        let mut stats = HarvestStats {
            candidates,
            rejected: candidates.saturating_sub(records.len()),
            ..HarvestStats::default()
        };
        for record in records {
            match self.store.merge(record, base, &policy) {
                MergeOutcome::Added(link) => {
                    trace!(link = %link, "Record added");
                    stats.added += 1;
                }
                MergeOutcome::Duplicate(_) => stats.duplicates += 1,
                MergeOutcome::Rejected => stats.rejected += 1,
                MergeOutcome::Full => break,
            }
        }
        if stats.added == 0 {
            self.stall_count += 1;
        } else {
            self.stall_count = 0;
        }
        stats
    }

    /// Moves to the next iteration.
    pub fn advance(&mut self) {
        self.iteration += 1;
    }

    /// Consumes the run, returning records in discovery order, at most `quota`.
    #[must_use]
    pub fn into_records(self) -> Vec<Record> {
        let quota = self.request.quota;
        self.store.into_records(quota)
    }
}
