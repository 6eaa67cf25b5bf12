//! Logging setup and run summaries.

mod logging;
mod summary;

pub use logging::{init_tracing, LogFormat};
pub use summary::SummaryEmitter;
