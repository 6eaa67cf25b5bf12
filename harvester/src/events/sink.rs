//! Progress sink trait and implementations.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info, Level};

use super::{ProgressEvent, ProgressStep};

/// Receives progress events.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Emits an event asynchronously.
    async fn emit(&self, event: ProgressEvent);

    /// Emits an event without blocking. Must never panic or fail.
    fn try_emit(&self, event: ProgressEvent);
}

/// A sink that discards all events.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgressSink;

#[async_trait]
impl ProgressSink for NoOpProgressSink {
    async fn emit(&self, _event: ProgressEvent) {}

    fn try_emit(&self, _event: ProgressEvent) {}
}

/// A sink that logs events using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingProgressSink {
    level: Level,
}

impl Default for LoggingProgressSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingProgressSink {
    /// Creates a logging sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log_event(&self, event: &ProgressEvent) {
        if self.level == Level::DEBUG {
            debug!(
                step = %event.step,
                progress = event.progress_percent,
                "{}", event.message
            );
        } else {
            info!(
                step = %event.step,
                progress = event.progress_percent,
                "{}", event.message
            );
        }
    }
}

#[async_trait]
impl ProgressSink for LoggingProgressSink {
    async fn emit(&self, event: ProgressEvent) {
        self.log_event(&event);
    }

    fn try_emit(&self, event: ProgressEvent) {
        self.log_event(&event);
    }
}

/// A sink that keeps every event, for tests and host-side inspection.
#[derive(Debug, Default)]
pub struct CollectingProgressSink {
    events: RwLock<Vec<ProgressEvent>>,
}

impl CollectingProgressSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Returns events for one step.
    #[must_use]
    pub fn events_for(&self, step: ProgressStep) -> Vec<ProgressEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.step == step)
            .cloned()
            .collect()
    }

    /// Returns the most recent event.
    #[must_use]
    pub fn last(&self) -> Option<ProgressEvent> {
        self.events.read().last().cloned()
    }
}

#[async_trait]
impl ProgressSink for CollectingProgressSink {
    async fn emit(&self, event: ProgressEvent) {
        self.events.write().push(event);
    }

    fn try_emit(&self, event: ProgressEvent) {
        self.events.write().push(event);
    }
}
