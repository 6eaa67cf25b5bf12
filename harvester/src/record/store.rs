//! Insertion-ordered, link-deduplicated item store.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{Record, LINK_FIELD};
use crate::utils::canonical_link;

/// Placeholder name produced by extractors that found no title.
const PLACEHOLDER_NAME: &str = "N/A";

/// Rules a candidate must satisfy before it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptancePolicy {
    /// Minimum trimmed name length, in characters.
    #[serde(default = "default_min_name_len")]
    pub min_name_len: usize,
}

fn default_min_name_len() -> usize {
    3
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self {
            min_name_len: default_min_name_len(),
        }
    }
}

impl AcceptancePolicy {
    /// Returns true if `name` passes the noise filter.
    #[must_use]
    pub fn accepts_name(&self, name: Option<&str>) -> bool {
        let Some(name) = name.map(str::trim) else {
            return false;
        };
        name != PLACEHOLDER_NAME && name.chars().count() >= self.min_name_len
    }
}

/// Result of merging one candidate into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Stored under the given canonical link.
    Added(String),
    /// The link was already stored; the candidate was dropped.
    Duplicate(String),
    /// Missing link or name too short.
    Rejected,
    /// The store is at capacity.
    Full,
}

/// Ordered map from canonical link to record.
///
/// Insertion order is discovery order. The first record stored for a link
/// wins; later candidates for the same link are dropped.
#[derive(Debug, Clone, Default)]
pub struct ItemStore {
    entries: Vec<(String, Record)>,
    index: HashSet<String>,
    capacity: Option<usize>,
}

impl ItemStore {
    /// Creates an unbounded store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that accepts at most `capacity` records.
    #[must_use]
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// Rebuilds a store from checkpointed entries, dropping repeated links.
    #[must_use]
    pub fn from_entries(entries: Vec<(String, Record)>, capacity: Option<usize>) -> Self {
        let mut store = Self {
            capacity,
            ..Self::default()
        };
        for (link, record) in entries {
            if store.index.insert(link.clone()) {
                store.entries.push((link, record));
            }
        }
        store
    }

    /// Merges a candidate.
    ///
    /// `base` is the address of the page the candidate came from; relative
    /// links are resolved against it. On success the record's link field is
    /// rewritten to the canonical form.
    pub fn merge(
        &mut self,
        mut record: Record,
        base: Option<&str>,
        policy: &AcceptancePolicy,
    ) -> MergeOutcome {
        let Some(link) = record.link().and_then(|raw| canonical_link(raw, base)) else {
            return MergeOutcome::Rejected;
        };
        if !policy.accepts_name(record.name()) {
            return MergeOutcome::Rejected;
        }
        if self.index.contains(&link) {
            return MergeOutcome::Duplicate(link);
        }
        if self.is_full() {
            return MergeOutcome::Full;
        }

        record.insert(LINK_FIELD, link.clone());
        self.index.insert(link.clone());
        self.entries.push((link.clone(), record));
        MergeOutcome::Added(link)
    }

    /// Returns true if `link` is stored.
    #[must_use]
    pub fn contains(&self, link: &str) -> bool {
        self.index.contains(link)
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if the capacity limit has been reached.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.capacity.is_some_and(|cap| self.entries.len() >= cap)
    }

    /// The capacity limit, if any.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Entries in discovery order.
    #[must_use]
    pub fn entries(&self) -> &[(String, Record)] {
        &self.entries
    }

    /// Iterates records in discovery order.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.entries.iter().map(|(_, r)| r)
    }

    /// Removes everything. Used only when a fresh run starts.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    /// Consumes the store, returning at most `limit` records in discovery order.
    #[must_use]
    pub fn into_records(self, limit: usize) -> Vec<Record> {
        self.entries
            .into_iter()
            .take(limit)
            .map(|(_, record)| record)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(link: &str, name: &str) -> Record {
        Record::new().with("link", link).with("name", name)
    }

    #[test]
    fn test_first_write_wins() {
        let mut store = ItemStore::new();
        let policy = AcceptancePolicy::default();
        let base = Some("https://shop.test/list");

        store.merge(item("a/1.html", "Widget X"), base, &policy);
        let dup = store.merge(item("a/1.html", "Widget X dup"), base, &policy);
        store.merge(item("a/2.html", "Widget Y"), base, &policy);

        assert_eq!(dup, MergeOutcome::Duplicate("https://shop.test/a/1.html".to_string()));
        let names: Vec<_> = store.records().filter_map(Record::name).collect();
        assert_eq!(names, vec!["Widget X", "Widget Y"]);
    }

    #[test]
    fn test_link_rewritten_to_canonical() {
        let mut store = ItemStore::new();
        store.merge(
            item("/p/9.html#reviews", "Widget Z"),
            Some("https://shop.test/list?page=2"),
            &AcceptancePolicy::default(),
        );
        assert_eq!(
            store.records().next().and_then(Record::link),
            Some("https://shop.test/p/9.html")
        );
    }

    #[test]
    fn test_noise_is_rejected() {
        let mut store = ItemStore::new();
        let policy = AcceptancePolicy::default();

        assert_eq!(store.merge(item("", "Widget"), None, &policy), MergeOutcome::Rejected);
        assert_eq!(store.merge(item("https://a/1", "ab"), None, &policy), MergeOutcome::Rejected);
        assert_eq!(store.merge(item("https://a/2", "N/A"), None, &policy), MergeOutcome::Rejected);
        assert_eq!(
            store.merge(Record::new().with("name", "No link"), None, &policy),
            MergeOutcome::Rejected
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_capacity_limit() {
        let mut store = ItemStore::with_capacity_limit(1);
        let policy = AcceptancePolicy::default();

        store.merge(item("https://a/1", "Widget 1"), None, &policy);
        let outcome = store.merge(item("https://a/2", "Widget 2"), None, &policy);

        assert_eq!(outcome, MergeOutcome::Full);
        assert_eq!(store.len(), 1);
        assert!(store.is_full());
    }

    #[test]
    fn test_from_entries_drops_repeats() {
        let entries = vec![
            ("https://a/1".to_string(), item("https://a/1", "One")),
            ("https://a/1".to_string(), item("https://a/1", "Again")),
            ("https://a/2".to_string(), item("https://a/2", "Two")),
        ];
        let store = ItemStore::from_entries(entries, None);

        assert_eq!(store.len(), 2);
        assert_eq!(store.records().next().and_then(Record::name), Some("One"));
    }

    #[test]
    fn test_into_records_truncates() {
        let mut store = ItemStore::new();
        let policy = AcceptancePolicy::default();
        for i in 0..5 {
            store.merge(item(&format!("https://a/{i}"), "Widget"), None, &policy);
        }
        assert_eq!(store.into_records(3).len(), 3);
    }
}
