//! List -> detail -> export orchestration.
//!
//! The workflow loads `skip + limit` list records with a collection run,
//! slices their links to `[skip, skip + limit)`, fetches one detail record
//! per link, and optionally exports the details. Its plan rides in the
//! checkpoint `context`, so a workflow interrupted by a hard navigation is
//! picked up again with [`Workflow::resume`].

mod detail;
mod orchestrator;
mod plan;


pub use detail::DetailSource;
pub use orchestrator::{ExportTarget, Workflow, WorkflowCompletion, WorkflowOutcome};
pub use plan::{
    paginated_max_iterations, scrolling_max_iterations, select_links, WorkflowRequest,
};
