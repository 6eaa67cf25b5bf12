//! Test doubles for hosts wiring the harvester.
//!
//! - [`ScriptedCatalog`]: an in-memory catalog that behaves like a paginated
//!   or infinite-scroll listing page
//! - [`ScriptedDetailSource`]: canned detail records keyed by link
//! - [`json_record_extractor`]: an extractor for JSON candidate elements

mod catalog;
mod details;

pub use catalog::{CatalogMode, ScriptedCatalog};
pub use details::ScriptedDetailSource;

use crate::record::Record;

/// Extracts a record from a JSON object element. Non-objects are skipped.
#[must_use]
pub fn json_record_extractor(
    element: &serde_json::Value,
    _selector_config: &serde_json::Value,
) -> Option<Record> {
    Record::from_json(element.clone())
}

/// Builds a JSON candidate element with a link and a name.
#[must_use]
pub fn item(link: impl Into<String>, name: impl Into<String>) -> serde_json::Value {
    serde_json::json!({"link": link.into(), "name": name.into()})
}

/// Builds `count` pages of `per_page` distinct items each, numbered from 1.
#[must_use]
pub fn numbered_pages(count: usize, per_page: usize) -> Vec<Vec<serde_json::Value>> {
    (0..count)
        .map(|page| {
            (0..per_page)
                .map(|i| {
                    let n = page * per_page + i + 1;
                    item(format!("/p/item-{n}.html"), format!("Widget {n}"))
                })
                .collect()
        })
        .collect()
}
