//! Named truncation limits for the codec.
//!
//! Every limit here is lossy on purpose: oversized input is cut down and
//! marked, never rejected. Columns are taken from a header sample only, so a
//! field that first appears after the sample is dropped from the output.

use serde::{Deserialize, Serialize};

/// Marker appended to a truncated cell or row.
pub const TRUNCATION_MARKER: &str = "...[truncated]";

/// Marker appended to truncated scalars and JSON renderings inside a row.
pub const ELLIPSIS: &str = "...";

/// Limits applied while flattening and writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportLimits {
    /// Nesting depth below which subtrees are rendered as JSON text.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Keys read from any one object.
    #[serde(default = "default_max_keys_per_object")]
    pub max_keys_per_object: usize,
    /// Characters kept from a scalar value.
    #[serde(default = "default_max_scalar_len")]
    pub max_scalar_len: usize,
    /// Arrays longer than this become an `[Array(N)]` placeholder.
    #[serde(default = "default_max_array_items")]
    pub max_array_items: usize,
    /// Characters kept from an array's JSON rendering.
    #[serde(default = "default_max_array_json_len")]
    pub max_array_json_len: usize,
    /// Characters kept from a too-deep subtree's JSON rendering.
    #[serde(default = "default_max_subtree_json_len")]
    pub max_subtree_json_len: usize,
    /// Characters kept in one delimited cell.
    #[serde(default = "default_max_cell_len")]
    pub max_cell_len: usize,
    /// Characters kept in one delimited row.
    #[serde(default = "default_max_row_len")]
    pub max_row_len: usize,
    /// Records flattened to decide the column set.
    #[serde(default = "default_header_sample_size")]
    pub header_sample_size: usize,
    /// Records per delimited file.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Largest single output file, in bytes.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
}

fn default_max_depth() -> usize {
    5
}

fn default_max_keys_per_object() -> usize {
    1000
}

fn default_max_scalar_len() -> usize {
    10_000
}

fn default_max_array_items() -> usize {
    500
}

fn default_max_array_json_len() -> usize {
    5_000
}

fn default_max_subtree_json_len() -> usize {
    1_000
}

fn default_max_cell_len() -> usize {
    50_000
}

fn default_max_row_len() -> usize {
    1_000_000
}

fn default_header_sample_size() -> usize {
    5
}

fn default_chunk_size() -> usize {
    100
}

fn default_max_file_bytes() -> usize {
    50 * 1024 * 1024
}

impl Default for ExportLimits {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_keys_per_object: default_max_keys_per_object(),
            max_scalar_len: default_max_scalar_len(),
            max_array_items: default_max_array_items(),
            max_array_json_len: default_max_array_json_len(),
            max_subtree_json_len: default_max_subtree_json_len(),
            max_cell_len: default_max_cell_len(),
            max_row_len: default_max_row_len(),
            header_sample_size: default_header_sample_size(),
            chunk_size: default_chunk_size(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

impl ExportLimits {
    /// Sets the chunk size. Zero is treated as one.
    #[must_use]
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Sets the header sample size.
    #[must_use]
    pub fn with_header_sample_size(mut self, size: usize) -> Self {
        self.header_sample_size = size;
        self
    }

    /// Sets the maximum depth.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets the maximum row length.
    #[must_use]
    pub fn with_max_row_len(mut self, len: usize) -> Self {
        self.max_row_len = len;
        self
    }

    /// Sets the maximum file size.
    #[must_use]
    pub fn with_max_file_bytes(mut self, bytes: usize) -> Self {
        self.max_file_bytes = bytes;
        self
    }
}

/// Keeps the first `max` characters of `text`, appending `marker` if
/// anything was cut.
#[must_use]
pub fn truncate_with_marker(text: &str, max: usize, marker: &str) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + marker.len());
            out.push_str(&text[..cut]);
            out.push_str(marker);
            out
        }
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let limits: ExportLimits = serde_json::from_str("{}").expect("parse");
        assert_eq!(limits, ExportLimits::default());
        assert_eq!(limits.max_depth, 5);
        assert_eq!(limits.chunk_size, 100);
        assert_eq!(limits.max_file_bytes, 52_428_800);
    }

    #[test]
    fn test_truncate_with_marker() {
        assert_eq!(truncate_with_marker("abcdef", 3, ELLIPSIS), "abc...");
        assert_eq!(truncate_with_marker("abc", 3, ELLIPSIS), "abc");
        assert_eq!(truncate_with_marker("đồng hồ", 4, TRUNCATION_MARKER), "đồng...[truncated]");
    }

    #[test]
    fn test_zero_chunk_size_is_clamped() {
        assert_eq!(ExportLimits::default().with_chunk_size(0).chunk_size, 1);
    }
}
