//! Per-item detail fetching.

use async_trait::async_trait;

use crate::record::Record;

/// Fetches the detail record for one item link.
///
/// `Ok(None)` means the page had nothing usable. Both that and an error are
/// skipped by the workflow, which carries on with the next link.
#[async_trait]
pub trait DetailSource: Send + Sync {
    /// Fetches the detail record behind `link`.
    async fn fetch(&self, link: &str) -> anyhow::Result<Option<Record>>;
}
