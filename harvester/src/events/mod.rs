//! Progress reporting.
//!
//! The controller and the workflow orchestrator report `{step, message,
//! progressPercent}` events at iteration boundaries and at termination.
//! Sinks are passed explicitly; there is no process-wide sink.

mod sink;

pub use sink::{CollectingProgressSink, LoggingProgressSink, NoOpProgressSink, ProgressSink};

use serde::{Deserialize, Serialize};
use std::fmt;

/// The phase a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStep {
    /// Walking the catalog and collecting list records.
    LoadingList,
    /// Fetching per-item detail records.
    ScrapingDetails,
    /// Serializing output files.
    Exporting,
    /// The run finished.
    Done,
}

impl fmt::Display for ProgressStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadingList => write!(f, "loading_list"),
            Self::ScrapingDetails => write!(f, "scraping_details"),
            Self::Exporting => write!(f, "exporting"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// One progress notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Phase.
    pub step: ProgressStep,
    /// Human-readable status line.
    pub message: String,
    /// Completion within the phase, 0-100.
    pub progress_percent: u8,
}

impl ProgressEvent {
    /// Creates an event, clamping the percentage to 100.
    #[must_use]
    pub fn new(step: ProgressStep, message: impl Into<String>, progress_percent: u8) -> Self {
        Self {
            step,
            message: message.into(),
            progress_percent: progress_percent.min(100),
        }
    }

    /// Creates an event whose percentage is `done / total`.
    #[must_use]
    pub fn ratio(step: ProgressStep, message: impl Into<String>, done: usize, total: usize) -> Self {
        Self::new(step, message, percent(done, total))
    }
}

/// `done / total` as a whole percentage in 0..=100. An empty total is complete.
#[must_use]
pub fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = done.min(total).saturating_mul(100) / total;
    u8::try_from(pct).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 10), 0);
        assert_eq!(percent(5, 10), 50);
        assert_eq!(percent(12, 10), 100);
        assert_eq!(percent(0, 0), 100);
    }

    #[test]
    fn test_event_wire_shape() {
        let event = ProgressEvent::new(ProgressStep::LoadingList, "page 2", 40);
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"step": "loading_list", "message": "page 2", "progressPercent": 40})
        );
    }

    #[test]
    fn test_event_clamps_percentage() {
        assert_eq!(ProgressEvent::new(ProgressStep::Done, "", 250).progress_percent, 100);
    }
}
