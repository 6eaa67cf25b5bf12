//! Host-level configuration.
//!
//! [`HarvestConfig`] bundles the defaults a host applies to every run. It is
//! plain serde data and can be loaded from a JSON file; every field may be
//! omitted.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::checkpoint::{CheckpointPolicy, CheckpointStore, FileCheckpointStore, InMemoryCheckpointStore};
use crate::codec::ExportOptions;
use crate::collection::{CollectionRequest, GrowthWaitConfig, Strategy};
use crate::errors::HarvestError;
use crate::observability::LogFormat;

/// Defaults applied to new collection requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDefaults {
    /// Strategy used when the host does not pick one.
    #[serde(default)]
    pub strategy: Strategy,
    /// Iteration cap.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Pause between iterations.
    #[serde(default = "default_inter_iteration_delay_ms")]
    pub inter_iteration_delay_ms: u64,
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

impl Default for CollectionDefaults {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            max_iterations: default_max_iterations(),
            inter_iteration_delay_ms: default_inter_iteration_delay_ms(),
            min_name_len: default_min_name_len(),
        }
    }
}

impl CollectionDefaults {
    /// Builds a request for `quota` records with these defaults.
    #[must_use]
    pub fn request(&self, quota: usize) -> CollectionRequest {
        CollectionRequest::new(quota, self.strategy)
            .with_max_iterations(self.max_iterations)
            .with_inter_iteration_delay_ms(self.inter_iteration_delay_ms)
            .with_min_name_len(self.min_name_len)
    }
}

/// Subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: default_level(),
        }
    }
}

/// Everything a host configures once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Collection request defaults.
    #[serde(default)]
    pub collection: CollectionDefaults,
    /// Growth-wait polling.
    #[serde(default)]
    pub growth: GrowthWaitConfig,
    /// Checkpoint staleness rules.
    #[serde(default)]
    pub checkpoint: CheckpointPolicy,
    /// Checkpoint file. Without one, checkpoints live in memory.
    #[serde(default)]
    pub checkpoint_path: Option<PathBuf>,
    /// Export settings.
    #[serde(default)]
    pub export: ExportOptions,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HarvestConfig {
    /// Loads a configuration from a JSON file.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, HarvestError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_json_str(&text)
            .map_err(|e| HarvestError::Config(format!("{}: {e}", path.display())))
    }

    /// Parses a configuration from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// The checkpoint store this configuration describes.
    #[must_use]
    pub fn checkpoint_store(&self) -> Arc<dyn CheckpointStore> {
        match &self.checkpoint_path {
            Some(path) => Arc::new(FileCheckpointStore::new(path.clone())),
            None => Arc::new(InMemoryCheckpointStore::new()),
        }
    }

    /// Installs the global subscriber described by [`LoggingConfig`].
    pub fn init_tracing(&self) -> bool {
        crate::observability::init_tracing(self.logging.format, &self.logging.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ExportFormat;
    use crate::collection::CollectionSession;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = HarvestConfig::from_json_str("{}").expect("parse");
        assert_eq!(config, HarvestConfig::default());
        assert_eq!(config.collection.max_iterations, 20);
        assert_eq!(config.growth.timeout_ms, 4000);
        assert_eq!(config.checkpoint.max_age_secs, 3600);
        assert_eq!(config.export.prefix, "scraped-data");
    }

    #[test]
    fn test_partial_document() {
        let config = HarvestConfig::from_json_str(
            r#"{
                "collection": {"strategy": "scrolling", "max_iterations": 60},
                "export": {"format": "json", "limits": {"chunk_size": 50}},
                "logging": {"format": "json"}
            }"#,
        )
        .expect("parse");

        assert_eq!(config.collection.strategy, Strategy::Scrolling);
        assert_eq!(config.collection.max_iterations, 60);
        assert_eq!(config.collection.inter_iteration_delay_ms, 1200);
        assert_eq!(config.export.format, ExportFormat::Json);
        assert_eq!(config.export.limits.chunk_size, 50);
        assert_eq!(config.export.limits.header_sample_size, 5);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_defaults_build_requests() {
        let defaults = CollectionDefaults {
            strategy: Strategy::Scrolling,
            max_iterations: 7,
            inter_iteration_delay_ms: 300,
            min_name_len: 5,
        };
        let request = defaults.request(40);

        assert_eq!(request.quota, 40);
        assert_eq!(request.strategy, Strategy::Scrolling);
        assert_eq!(request.max_iterations, 7);
        assert_eq!(request.inter_iteration_delay_ms, 300);
        assert_eq!(request.min_name_len, 5);
    }

    #[tokio::test]
    async fn test_from_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("harvest.json");
        let checkpoint_path = dir.path().join("state").join("checkpoint.json");
        let document = serde_json::json!({
            "checkpoint": {"max_age_secs": 60},
            "checkpoint_path": checkpoint_path,
        });
        std::fs::write(&path, document.to_string()).expect("write config");

        let config = HarvestConfig::from_path(&path).await.expect("load");
        assert_eq!(config.checkpoint.max_age_secs, 60);

        let store = config.checkpoint_store();
        let checkpoint = CollectionSession::new(config.collection.request(10)).to_checkpoint();
        store.save(&checkpoint).await.expect("save");
        assert!(checkpoint_path.exists());
    }

    #[tokio::test]
    async fn test_from_path_errors() {
        let dir = tempfile::tempdir().expect("tempdir");

        let missing = HarvestConfig::from_path(dir.path().join("absent.json")).await;
        assert!(matches!(missing, Err(HarvestError::Io(_))));

        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").expect("write");
        let broken = HarvestConfig::from_path(&path).await;
        let Err(HarvestError::Config(message)) = broken else {
            panic!("expected a config error");
        };
        assert!(message.contains("broken.json"));
    }
}
