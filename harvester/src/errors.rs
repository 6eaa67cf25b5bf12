//! Error types for the harvester crate.
//!
//! Errors here are the *fatal* kind: storage and file failures, invalid
//! export input, and workflow preconditions. Extraction noise, missing
//! continuation controls and growth-wait timeouts are expected conditions and
//! never surface as errors.

use thiserror::Error;

/// The main error type for harvester operations.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// A checkpoint store operation failed.
    #[error("{0}")]
    Checkpoint(#[from] CheckpointError),

    /// An export operation failed.
    #[error("{0}")]
    Export(#[from] ExportError),

    /// A workflow precondition failed.
    #[error("{0}")]
    Workflow(#[from] WorkflowError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by a checkpoint store backend.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// Reading or writing the slot failed.
    #[error("Checkpoint IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The slot contents could not be encoded or decoded.
    #[error("Checkpoint serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend-specific failure.
    #[error("Checkpoint backend error: {0}")]
    Backend(String),
}

impl CheckpointError {
    /// Creates a backend error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// Errors raised while producing or writing export files.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Nothing to export.
    #[error("Export batch is empty")]
    EmptyBatch,

    /// The header sample produced no columns.
    #[error("No columns found in the header sample")]
    NoColumns,

    /// A single output file exceeds the size guard.
    #[error("Export file '{filename}' is too large: {size_bytes} bytes (limit {limit_bytes})")]
    FileTooLarge {
        /// The offending file name.
        filename: String,
        /// Its size in bytes.
        size_bytes: usize,
        /// The configured limit.
        limit_bytes: usize,
    },

    /// The delimited writer failed.
    #[error("Delimited writer error: {0}")]
    Delimited(#[from] csv::Error),

    /// JSON encoding failed.
    #[error("Export serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing an output file failed.
    #[error("Export IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the workflow orchestrator.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The skip offset consumed every collected link.
    #[error("No links left after skipping {skip} items (collected {total})")]
    NoLinksAfterSkip {
        /// The requested skip offset.
        skip: usize,
        /// The number of links collected.
        total: usize,
    },

    /// The list collection ended in a way the workflow cannot continue from.
    #[error("Collection failed: {0}")]
    Collection(String),
}

/// Convenience result alias.
pub type Result<T, E = HarvestError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_error_converts() {
        let err: HarvestError = CheckpointError::backend("quota exceeded").into();
        assert_eq!(err.to_string(), "Checkpoint backend error: quota exceeded");
    }

    #[test]
    fn test_file_too_large_message() {
        let err = ExportError::FileTooLarge {
            filename: "a.csv".to_string(),
            size_bytes: 10,
            limit_bytes: 5,
        };
        assert!(err.to_string().contains("a.csv"));
        assert!(err.to_string().contains("limit 5"));
    }

    #[test]
    fn test_no_links_after_skip_message() {
        let err = WorkflowError::NoLinksAfterSkip { skip: 20, total: 12 };
        assert_eq!(
            err.to_string(),
            "No links left after skipping 20 items (collected 12)"
        );
    }
}
