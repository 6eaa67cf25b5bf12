//! # Harvester
//!
//! A resumable catalog collection engine with a flatten/export codec.
//!
//! - **Collection**: drives a host page surface toward a quota of unique
//!   records, across in-place "load more" triggers and hard navigations
//! - **Checkpoints**: the run state survives a page reload and resumes from
//!   a single persisted slot
//! - **Codec**: normalizes, flattens and writes records as chunked CSV or JSON
//! - **Workflow**: list -> detail -> export orchestration on top of the above
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use harvester::prelude::*;
//!
//! let controller = CollectionController::new(surface, extractor, checkpoints);
//! match controller.run(CollectionRequest::new(100, Strategy::Scrolling)).await? {
//!     RunOutcome::Finished(report) => {
//!         let files = Exporter::default().export_records(&report.records)?;
//!     }
//!     RunOutcome::Suspended { .. } => { /* resume after the page loads */ }
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod checkpoint;
pub mod codec;
pub mod collection;
pub mod config;
pub mod errors;
pub mod events;
pub mod observability;
pub mod record;
pub mod testing;
pub mod utils;
pub mod workflow;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::checkpoint::{
        Checkpoint, CheckpointPolicy, CheckpointStore, FileCheckpointStore,
        InMemoryCheckpointStore,
    };
    pub use crate::codec::{ExportFile, ExportFormat, ExportLimits, ExportOptions, Exporter};
    pub use crate::collection::{
        CollectionController, CollectionReport, CollectionRequest, Continuation, Extractor,
        GrowthWaitConfig, PageSurface, RunOutcome, Strategy, Termination,
    };
    pub use crate::config::HarvestConfig;
    pub use crate::errors::{CheckpointError, ExportError, HarvestError, WorkflowError};
    pub use crate::events::{
        LoggingProgressSink, NoOpProgressSink, ProgressEvent, ProgressSink, ProgressStep,
    };
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::record::{Record, Value};
    pub use crate::utils::{generate_request_id, Timestamp};
    pub use crate::workflow::{
        DetailSource, Workflow, WorkflowCompletion, WorkflowOutcome, WorkflowRequest,
    };
}
