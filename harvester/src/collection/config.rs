//! Collection request and timing configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::errors::HarvestError;
use crate::record::AcceptancePolicy;
use crate::utils::generate_request_id;

/// Consecutive zero-yield scrolling iterations that end a run as stalled.
pub const STALL_LIMIT: usize = 3;

/// How the catalog is traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Follow a next-page control, possibly through a hard navigation.
    #[default]
    Paginated,
    /// Infinite scroll or a load-more control, always in place.
    Scrolling,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paginated => write!(f, "paginated"),
            Self::Scrolling => write!(f, "scrolling"),
        }
    }
}

/// One collection run's parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionRequest {
    /// Number of unique records wanted.
    pub quota: usize,
    /// Traversal strategy.
    #[serde(default)]
    pub strategy: Strategy,
    /// Opaque configuration for the extractor and the continuation finder.
    #[serde(default)]
    pub selector_config: serde_json::Value,
    /// Iteration cap.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Delay after each in-place advance.
    #[serde(default = "default_inter_iteration_delay_ms")]
    pub inter_iteration_delay_ms: u64,
    /// Request identifier, carried into the checkpoint.
    #[serde(default = "generate_request_id")]
    pub request_id: String,
    /// Ignore and discard any existing checkpoint.
    #[serde(default)]
    pub fresh_start: bool,
    /// Opaque caller state carried through the checkpoint.
    #[serde(default)]
    pub context: serde_json::Value,
    /// Minimum accepted name length.
    #[serde(default = "default_min_name_len")]
    pub min_name_len: usize,
}

fn default_max_iterations() -> usize {
    20
}

fn default_inter_iteration_delay_ms() -> u64 {
    1200
}

fn default_min_name_len() -> usize {
    3
}

impl CollectionRequest {
    /// Creates a request with default limits.
    #[must_use]
    pub fn new(quota: usize, strategy: Strategy) -> Self {
        Self {
            quota,
            strategy,
            selector_config: serde_json::Value::Null,
            max_iterations: default_max_iterations(),
            inter_iteration_delay_ms: default_inter_iteration_delay_ms(),
            request_id: generate_request_id(),
            fresh_start: false,
            context: serde_json::Value::Null,
            min_name_len: default_min_name_len(),
        }
    }

    /// Sets the selector configuration.
    #[must_use]
    pub fn with_selector_config(mut self, config: serde_json::Value) -> Self {
        self.selector_config = config;
        self
    }

    /// Sets the iteration cap.
    #[must_use]
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Sets the inter-iteration delay.
    #[must_use]
    pub fn with_inter_iteration_delay_ms(mut self, delay_ms: u64) -> Self {
        self.inter_iteration_delay_ms = delay_ms;
        self
    }

    /// Sets the request identifier.
    #[must_use]
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = id.into();
        self
    }

    /// Requests a fresh start.
    #[must_use]
    pub fn with_fresh_start(mut self, fresh: bool) -> Self {
        self.fresh_start = fresh;
        self
    }

    /// Attaches caller state.
    #[must_use]
    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }

    /// Sets the minimum accepted name length.
    #[must_use]
    pub fn with_min_name_len(mut self, len: usize) -> Self {
        self.min_name_len = len;
        self
    }

    /// The inter-iteration delay as a duration.
    #[must_use]
    pub fn inter_iteration_delay(&self) -> Duration {
        Duration::from_millis(self.inter_iteration_delay_ms)
    }

    /// The record acceptance rules for this request.
    #[must_use]
    pub fn acceptance_policy(&self) -> AcceptancePolicy {
        AcceptancePolicy {
            min_name_len: self.min_name_len,
        }
    }

    /// Checks the request before a run starts.
    pub fn validate(&self) -> Result<(), HarvestError> {
        if self.quota == 0 {
            return Err(HarvestError::Config("quota must be positive".to_string()));
        }
        if self.max_iterations == 0 {
            return Err(HarvestError::Config(
                "max_iterations must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Polling parameters for the in-place growth wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthWaitConfig {
    /// Interval between element-count probes.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Give up waiting after this long and proceed anyway.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_timeout_ms() -> u64 {
    4000
}

impl Default for GrowthWaitConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl GrowthWaitConfig {
    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Sets the poll interval.
    #[must_use]
    pub fn with_poll_interval_ms(mut self, interval_ms: u64) -> Self {
        self.poll_interval_ms = interval_ms;
        self
    }

    /// Poll interval as a duration; never zero.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Timeout as a duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_defaults_from_json() {
        let request: CollectionRequest =
            serde_json::from_value(json!({"quota": 40, "strategy": "scrolling"})).expect("parse");
        assert_eq!(request.strategy, Strategy::Scrolling);
        assert_eq!(request.max_iterations, 20);
        assert_eq!(request.inter_iteration_delay_ms, 1200);
        assert_eq!(request.min_name_len, 3);
        assert!(request.request_id.starts_with("req_"));
        assert!(!request.fresh_start);
    }

    #[test]
    fn test_validate() {
        assert!(CollectionRequest::new(1, Strategy::Paginated).validate().is_ok());
        assert!(CollectionRequest::new(0, Strategy::Paginated).validate().is_err());
        assert!(CollectionRequest::new(5, Strategy::Scrolling)
            .with_max_iterations(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_growth_wait_defaults() {
        let config = GrowthWaitConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.timeout(), Duration::from_secs(4));
        assert_eq!(config.with_poll_interval_ms(0).poll_interval(), Duration::from_millis(1));
    }
}
