//! Resumable catalog collection.
//!
//! A [`CollectionController`] repeatedly harvests the visible candidates of a
//! [`PageSurface`], merges them into a link-deduplicated store, and either
//! terminates, advances in place, or checkpoints and follows a hard
//! navigation. Because a navigation ends the current process of the page,
//! the controller is rebuilt from the checkpoint alone on the next load.

mod config;
mod controller;
mod growth;
mod session;
mod surface;


pub use config::{CollectionRequest, GrowthWaitConfig, Strategy, STALL_LIMIT};
pub use controller::{CollectionController, CollectionReport, RunOutcome, Termination};
pub use growth::{wait_for_growth, GrowthOutcome};
pub use session::{CollectionSession, HarvestStats};
pub use surface::{Continuation, Extractor, PageSurface};
