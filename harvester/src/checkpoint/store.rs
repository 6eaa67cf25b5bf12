//! Checkpoint store trait and backends.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::Checkpoint;
use crate::errors::CheckpointError;

/// Durable single-slot persistence for one in-flight collection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Overwrites the slot.
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError>;

    /// Returns the slot contents, if any.
    async fn load(&self) -> Result<Option<Checkpoint>, CheckpointError>;

    /// Empties the slot. Clearing an empty slot succeeds.
    async fn clear(&self) -> Result<(), CheckpointError>;
}

/// In-memory checkpoint store.
///
/// Survives controller restarts within one process, which is what the
/// navigation-resume tests rely on.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    slot: Mutex<Option<Checkpoint>>,
}

impl InMemoryCheckpointStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the slot is occupied.
    #[must_use]
    pub fn is_occupied(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Returns a copy of the slot without going through the async API.
    #[must_use]
    pub fn peek(&self) -> Option<Checkpoint> {
        self.slot.lock().clone()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        *self.slot.lock() = Some(checkpoint.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        Ok(self.slot.lock().clone())
    }

    async fn clear(&self) -> Result<(), CheckpointError> {
        self.slot.lock().take();
        Ok(())
    }
}

/// File-backed checkpoint store.
///
/// The slot is one pretty-printed JSON file. Saves go through a sibling
/// temporary file and a rename so a crash mid-write never leaves a torn slot.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    /// Creates a store backed by `path`. The file need not exist.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the slot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let text = checkpoint.to_json_pretty()?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let temp = self.temp_path();
        tokio::fs::write(&temp, text).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        debug!(path = %self.path.display(), entries = checkpoint.len(), "Checkpoint saved");
        Ok(())
    }

    async fn load(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(Some(Checkpoint::from_json_str(&text)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self) -> Result<(), CheckpointError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
