//! Scripted detail source.

use anyhow::bail;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

use crate::record::Record;
use crate::workflow::DetailSource;

/// Canned detail records keyed by link.
///
/// Unknown links yield nothing unless the source was built with
/// [`ScriptedDetailSource::generating`], in which case a record is
/// synthesized from the link.
#[derive(Debug, Default)]
pub struct ScriptedDetailSource {
    records: HashMap<String, Record>,
    failing: HashSet<String>,
    generate: bool,
    fetched: Mutex<Vec<String>>,
}

impl ScriptedDetailSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Synthesizes a record for any link without a canned one.
    #[must_use]
    pub fn generating() -> Self {
        Self {
            generate: true,
            ..Self::default()
        }
    }

    /// Registers the record returned for `link`.
    #[must_use]
    pub fn with_record(mut self, link: impl Into<String>, record: Record) -> Self {
        self.records.insert(link.into(), record);
        self
    }

    /// Makes fetching `link` fail.
    #[must_use]
    pub fn failing(mut self, link: impl Into<String>) -> Self {
        self.failing.insert(link.into());
        self
    }

    /// Links fetched so far, in order.
    #[must_use]
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().clone()
    }
}

#[async_trait]
impl DetailSource for ScriptedDetailSource {
    async fn fetch(&self, link: &str) -> anyhow::Result<Option<Record>> {
        self.fetched.lock().push(link.to_string());
        if self.failing.contains(link) {
            bail!("detail page {link} timed out");
        }
        if let Some(record) = self.records.get(link) {
            return Ok(Some(record.clone()));
        }
        if !self.generate {
            return Ok(None);
        }
        let slug = link
            .rsplit('/')
            .next()
            .unwrap_or(link)
            .trim_end_matches(".html");
        Ok(Some(
            Record::new()
                .with("link", link)
                .with("name", format!("Detail {slug}"))
                .with("price", "19.90")
                .with("brand", "Acme"),
        ))
    }
}
