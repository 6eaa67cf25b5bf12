//! Workflow parameters and sizing heuristics.

use serde::{Deserialize, Serialize};

use crate::collection::{CollectionRequest, Strategy};
use crate::errors::HarvestError;
use crate::record::Record;
use crate::utils::generate_request_id;

/// Items a scroll step is assumed to reveal.
const ITEMS_PER_SCROLL: usize = 8;
/// Extra scroll iterations on top of the estimate.
const SCROLL_BUFFER: usize = 40;
/// Items a catalog page is assumed to hold.
const ITEMS_PER_PAGE: usize = 20;
/// Extra pages on top of the estimate.
const PAGE_BUFFER: usize = 2;

const SCROLL_DELAY_MS: u64 = 700;
const PAGE_DELAY_MS: u64 = 1200;

/// Iteration cap for a scrolling run that must reach `n` items.
#[must_use]
pub fn scrolling_max_iterations(n: usize) -> usize {
    n.div_ceil(ITEMS_PER_SCROLL) + SCROLL_BUFFER
}

/// Iteration cap for a paginated run that must reach `n` items.
#[must_use]
pub fn paginated_max_iterations(n: usize) -> usize {
    n.div_ceil(ITEMS_PER_PAGE) + PAGE_BUFFER
}

/// One list -> detail -> export run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRequest {
    /// List items to skip before fetching details.
    #[serde(default)]
    pub skip: usize,
    /// Detail records wanted.
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// How the list is traversed.
    #[serde(default = "default_strategy")]
    pub strategy: Strategy,
    /// Opaque extractor / continuation configuration.
    #[serde(default)]
    pub selector_config: serde_json::Value,
    /// Pause between detail fetches.
    #[serde(default = "default_detail_delay_ms")]
    pub detail_delay_ms: u64,
    /// Only links containing this text are treated as item links.
    #[serde(default = "default_link_marker")]
    pub link_marker: String,
    /// Request identifier.
    #[serde(default = "generate_request_id")]
    pub request_id: String,
    /// Discard any saved checkpoint instead of resuming it.
    #[serde(default)]
    pub fresh_start: bool,
}

/// Context key the plan is stored under.
const PLAN_KEY: &str = "workflow";

fn default_limit() -> usize {
    100
}

fn default_strategy() -> Strategy {
    Strategy::Scrolling
}

fn default_detail_delay_ms() -> u64 {
    2000
}

fn default_link_marker() -> String {
    ".html".to_string()
}

impl WorkflowRequest {
    /// Creates a request with default pacing.
    #[must_use]
    pub fn new(skip: usize, limit: usize, strategy: Strategy) -> Self {
        Self {
            skip,
            limit,
            strategy,
            selector_config: serde_json::Value::Null,
            detail_delay_ms: default_detail_delay_ms(),
            link_marker: default_link_marker(),
            request_id: generate_request_id(),
            fresh_start: false,
        }
    }

    /// Sets the selector configuration.
    #[must_use]
    pub fn with_selector_config(mut self, config: serde_json::Value) -> Self {
        self.selector_config = config;
        self
    }

    /// Sets the detail delay.
    #[must_use]
    pub fn with_detail_delay_ms(mut self, delay_ms: u64) -> Self {
        self.detail_delay_ms = delay_ms;
        self
    }

    /// Sets the link marker.
    #[must_use]
    pub fn with_link_marker(mut self, marker: impl Into<String>) -> Self {
        self.link_marker = marker.into();
        self
    }

    /// Sets the request identifier.
    #[must_use]
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = id.into();
        self
    }

    /// Discards any saved checkpoint when set.
    #[must_use]
    pub fn with_fresh_start(mut self, fresh_start: bool) -> Self {
        self.fresh_start = fresh_start;
        self
    }

    /// List records to load: `skip + limit`.
    #[must_use]
    pub fn max_products(&self) -> usize {
        self.skip + self.limit
    }

    /// Builds the list collection request, embedding this plan as context.
    pub fn collection_request(&self) -> Result<CollectionRequest, HarvestError> {
        let n = self.max_products();
        let (max_iterations, delay_ms) = match self.strategy {
            Strategy::Scrolling => (scrolling_max_iterations(n), SCROLL_DELAY_MS),
            Strategy::Paginated => (paginated_max_iterations(n), PAGE_DELAY_MS),
        };
        let mut context = serde_json::Map::new();
        context.insert(PLAN_KEY.to_string(), serde_json::to_value(self)?);
        Ok(CollectionRequest::new(n, self.strategy)
            .with_selector_config(self.selector_config.clone())
            .with_max_iterations(max_iterations)
            .with_inter_iteration_delay_ms(delay_ms)
            .with_request_id(self.request_id.clone())
            .with_fresh_start(self.fresh_start)
            .with_context(serde_json::Value::Object(context)))
    }

    /// Recovers a plan from a checkpoint context. Contexts written by
    /// anything other than a workflow yield `None`.
    #[must_use]
    pub fn from_context(context: &serde_json::Value) -> Option<Self> {
        let plan = context.get(PLAN_KEY).filter(|plan| plan.is_object())?;
        serde_json::from_value(plan.clone()).ok()
    }
}

/// Item links of `records` that contain `marker`, sliced to
/// `[skip, skip + limit)`. Also returns how many item links there were.
#[must_use]
pub fn select_links(records: &[Record], request: &WorkflowRequest) -> (Vec<String>, usize) {
    let links: Vec<&str> = records
        .iter()
        .filter_map(Record::link)
        .filter(|link| link.contains(&request.link_marker))
        .collect();
    let total = links.len();
    let selected = links
        .into_iter()
        .skip(request.skip)
        .take(request.limit)
        .map(str::to_string)
        .collect();
    (selected, total)
}
