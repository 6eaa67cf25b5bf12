//! Export of record batches to delimited or JSON files.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::delimited::{collect_headers, render_document};
use super::limits::ExportLimits;
use super::normalize::{category_slug, normalize};
use crate::errors::ExportError;
use crate::record::{Record, Value};
use crate::utils::{epoch_millis, now_utc, Timestamp};

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Delimited text, chunked by item count.
    #[default]
    Csv,
    /// One pretty-printed JSON array of grouped records.
    Json,
}

impl ExportFormat {
    /// File extension, without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    /// MIME type of the output.
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Json => "application/json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Export settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// File name prefix.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Output format.
    #[serde(default)]
    pub format: ExportFormat,
    /// Position of this batch within a larger logical set; shifts chunk ranges.
    #[serde(default)]
    pub skip_offset: usize,
    /// Truncation and chunking limits.
    #[serde(default)]
    pub limits: ExportLimits,
}

fn default_prefix() -> String {
    "scraped-data".to_string()
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            format: ExportFormat::default(),
            skip_offset: 0,
            limits: ExportLimits::default(),
        }
    }
}

impl ExportOptions {
    /// Sets the prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the format.
    #[must_use]
    pub fn with_format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the skip offset.
    #[must_use]
    pub fn with_skip_offset(mut self, skip: usize) -> Self {
        self.skip_offset = skip;
        self
    }

    /// Sets the limits.
    #[must_use]
    pub fn with_limits(mut self, limits: ExportLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// One rendered output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    /// File name, without directory.
    pub filename: String,
    /// File contents.
    pub content: String,
    /// MIME type.
    pub mime_type: &'static str,
    /// 1-based inclusive item range, for chunked output.
    pub range: Option<(usize, usize)>,
    /// Items in this file.
    pub item_count: usize,
}

impl ExportFile {
    /// Size in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.content.len()
    }
}

/// Renders batches into files.
#[derive(Debug, Clone, Default)]
pub struct Exporter {
    options: ExportOptions,
}

impl Exporter {
    /// Creates an exporter.
    #[must_use]
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    /// The exporter's options.
    #[must_use]
    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Renders `records`. The records are only read.
    pub fn export_records(&self, records: &[Record]) -> Result<Vec<ExportFile>, ExportError> {
        let items: Vec<Value> = records.iter().cloned().map(Value::from).collect();
        self.export(&items)
    }

    /// Renders `items`, stamping single-file names with the current time.
    pub fn export(&self, items: &[Value]) -> Result<Vec<ExportFile>, ExportError> {
        self.export_at(items, &now_utc())
    }

    /// Renders `items`, stamping single-file names with `now`.
    pub fn export_at(&self, items: &[Value], now: &Timestamp) -> Result<Vec<ExportFile>, ExportError> {
        if items.is_empty() {
            return Err(ExportError::EmptyBatch);
        }
        let files = match self.options.format {
            ExportFormat::Csv => self.export_delimited(items, now)?,
            ExportFormat::Json => vec![self.export_json(items, now)?],
        };
        for file in &files {
            self.check_size(file)?;
        }
        info!(
            format = %self.options.format,
            items = items.len(),
            files = files.len(),
            "Export rendered"
        );
        Ok(files)
    }

    /// Renders `items` and writes the files into `dir`, creating it if needed.
    pub async fn write_to_dir(&self, items: &[Value], dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
        let files = self.export(items)?;
        write_files(&files, dir).await
    }

    fn single_filename(&self, now: &Timestamp) -> String {
        format!(
            "{}-{}.{}",
            self.options.prefix,
            epoch_millis(now),
            self.options.format.extension()
        )
    }

    fn export_delimited(&self, items: &[Value], now: &Timestamp) -> Result<Vec<ExportFile>, ExportError> {
        let limits = &self.options.limits;
        let headers = collect_headers(items, limits);
        if headers.is_empty() {
            return Err(ExportError::NoColumns);
        }
        debug!(columns = headers.len(), "Header sample collected");

        let chunk_size = limits.chunk_size.max(1);
        if items.len() <= chunk_size {
            return Ok(vec![ExportFile {
                filename: self.single_filename(now),
                content: render_document(&headers, items, limits)?,
                mime_type: ExportFormat::Csv.mime_type(),
                range: None,
                item_count: items.len(),
            }]);
        }

        let slug = category_slug(&normalize(&items[0]));
        let base = match slug {
            Some(slug) => format!("{}-{slug}", self.options.prefix),
            None => self.options.prefix.clone(),
        };
        items
            .chunks(chunk_size)
            .enumerate()
            .map(|(index, chunk)| {
                let start = self.options.skip_offset + index * chunk_size + 1;
                let end = start + chunk.len() - 1;
                Ok(ExportFile {
                    filename: format!("{base}-{start}-{end}.csv"),
                    content: render_document(&headers, chunk, limits)?,
                    mime_type: ExportFormat::Csv.mime_type(),
                    range: Some((start, end)),
                    item_count: chunk.len(),
                })
            })
            .collect()
    }

    fn export_json(&self, items: &[Value], now: &Timestamp) -> Result<ExportFile, ExportError> {
        let document: Vec<serde_json::Value> = items.iter().map(|item| normalize(item).to_json()).collect();
        Ok(ExportFile {
            filename: self.single_filename(now),
            content: serde_json::to_string_pretty(&document)?,
            mime_type: ExportFormat::Json.mime_type(),
            range: None,
            item_count: items.len(),
        })
    }

    fn check_size(&self, file: &ExportFile) -> Result<(), ExportError> {
        let limit = self.options.limits.max_file_bytes;
        if file.size_bytes() > limit {
            return Err(ExportError::FileTooLarge {
                filename: file.filename.clone(),
                size_bytes: file.size_bytes(),
                limit_bytes: limit,
            });
        }
        Ok(())
    }
}

/// Writes rendered files into `dir`, creating it if needed.
pub async fn write_files(files: &[ExportFile], dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    tokio::fs::create_dir_all(dir).await?;
    let mut paths = Vec::with_capacity(files.len());
    for file in files {
        let path = dir.join(&file.filename);
        tokio::fs::write(&path, file.content.as_bytes()).await?;
        debug!(path = %path.display(), bytes = file.size_bytes(), "Export file written");
        paths.push(path);
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_now() -> Timestamp {
        chrono::Utc
            .timestamp_millis_opt(1_700_000_000_123)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn test_single_file_name() {
        let files = Exporter::default()
            .export_at(&[Value::from(json!({"name": "Widget"}))], &fixed_now())
            .expect("export");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "scraped-data-1700000000123.csv");
        assert_eq!(files[0].range, None);
    }

    #[test]
    fn test_empty_batch() {
        let err = Exporter::default().export(&[]).unwrap_err();
        assert!(matches!(err, ExportError::EmptyBatch));
    }

    #[test]
    fn test_no_columns() {
        let err = Exporter::default()
            .export(&[Value::from(json!(1)), Value::from(json!("x"))])
            .unwrap_err();
        assert!(matches!(err, ExportError::NoColumns));
    }

    #[test]
    fn test_json_document_is_grouped_and_pretty() {
        let options = ExportOptions::default().with_format(ExportFormat::Json).with_prefix("catalog");
        let files = Exporter::new(options)
            .export_at(&[Value::from(json!({"name": "Widget", "link": "/w.html"}))], &fixed_now())
            .expect("export");

        assert_eq!(files[0].filename, "catalog-1700000000123.json");
        assert_eq!(files[0].mime_type, "application/json");
        assert!(files[0].content.contains("\n  {"));
        let parsed: serde_json::Value = serde_json::from_str(&files[0].content).expect("json");
        assert_eq!(parsed[0]["basicInfo"]["name"], "Widget");
    }

    #[test]
    fn test_file_size_guard() {
        let options = ExportOptions::default()
            .with_limits(ExportLimits::default().with_max_file_bytes(64));
        let err = Exporter::new(options)
            .export(&[Value::from(json!({"name": "x".repeat(200)}))])
            .unwrap_err();
        assert!(matches!(err, ExportError::FileTooLarge { limit_bytes: 64, .. }));
    }

    #[tokio::test]
    async fn test_write_to_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("out");
        let paths = Exporter::default()
            .write_to_dir(&[Value::from(json!({"name": "Widget"}))], &target)
            .await
            .expect("write");

        assert_eq!(paths.len(), 1);
        let text = std::fs::read_to_string(&paths[0]).expect("read");
        assert!(text.starts_with('\u{feff}'));
    }
}
