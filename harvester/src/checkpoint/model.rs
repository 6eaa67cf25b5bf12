//! The persisted checkpoint document.

use serde::{Deserialize, Serialize};

use crate::collection::Strategy;
use crate::record::Record;
use crate::utils::{age_secs, Timestamp};

/// Serialized controller state.
///
/// Field names are camelCase on the wire. `entries` keeps discovery order as
/// `[link, record]` pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    /// Stored records in discovery order.
    pub entries: Vec<(String, Record)>,
    /// The iteration the run will execute next.
    pub current_page: usize,
    /// Requested number of unique records.
    pub target_quota: usize,
    /// Opaque configuration for the extractor and continuation finder.
    #[serde(default)]
    pub selector_config: serde_json::Value,
    /// Identifier of the owning request.
    pub request_id: String,
    /// When the run started.
    pub created_at: Timestamp,
    /// When this snapshot was written. Absent in documents written before
    /// the field existed, in which case `created_at` stands in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<Timestamp>,
    /// Traversal strategy.
    #[serde(default)]
    pub strategy: Strategy,
    /// Iteration cap.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Delay applied after each in-place advance.
    #[serde(default = "default_inter_iteration_delay_ms")]
    pub inter_iteration_delay_ms: u64,
    /// Consecutive scrolling iterations that added nothing.
    #[serde(default)]
    pub stall_count: usize,
    /// Minimum accepted name length.
    #[serde(default = "default_min_name_len")]
    pub min_name_len: usize,
    /// Opaque caller state carried across navigations.
    #[serde(default)]
    pub context: serde_json::Value,
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

impl Checkpoint {
    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encodes the checkpoint as pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// When the slot was last written.
    #[must_use]
    pub fn last_saved(&self) -> Timestamp {
        self.saved_at.unwrap_or(self.created_at)
    }

    /// Decodes a checkpoint from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Rules applied to a checkpoint found at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointPolicy {
    /// Checkpoints older than this are abandoned.
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

fn default_max_age_secs() -> u64 {
    3600
}

impl Default for CheckpointPolicy {
    fn default() -> Self {
        Self {
            max_age_secs: default_max_age_secs(),
        }
    }
}

impl CheckpointPolicy {
    /// Sets the maximum age.
    #[must_use]
    pub fn with_max_age_secs(mut self, secs: u64) -> Self {
        self.max_age_secs = secs;
        self
    }

    /// Returns true if `checkpoint` was last saved more than `max_age_secs`
    /// before `now`. A long run that keeps saving never goes stale.
    #[must_use]
    pub fn is_stale(&self, checkpoint: &Checkpoint, now: &Timestamp) -> bool {
        age_secs(&checkpoint.last_saved(), now) > self.max_age_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::now_utc;
    use chrono::Duration;
    use serde_json::json;

    fn sample(created_at: Timestamp) -> Checkpoint {
        Checkpoint {
            entries: vec![(
                "https://shop.test/a/1.html".to_string(),
                Record::new()
                    .with("link", "https://shop.test/a/1.html")
                    .with("name", "Widget X"),
            )],
            current_page: 2,
            target_quota: 10,
            selector_config: json!({"item": ".card"}),
            request_id: "req_1".to_string(),
            created_at,
            saved_at: None,
            strategy: Strategy::Paginated,
            max_iterations: 20,
            inter_iteration_delay_ms: 1200,
            stall_count: 0,
            min_name_len: 3,
            context: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_wire_field_names() {
        let json = serde_json::to_value(sample(now_utc())).expect("serialize");
        let obj = json.as_object().expect("object");
        for key in ["entries", "currentPage", "targetQuota", "selectorConfig", "requestId", "createdAt"] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert_eq!(json["entries"][0][0], "https://shop.test/a/1.html");
        assert_eq!(json["entries"][0][1]["name"], "Widget X");
    }

    #[test]
    fn test_json_text_decodes() {
        let text = sample(now_utc()).to_json_pretty().expect("encode");
        let back = Checkpoint::from_json_str(&text).expect("decode");
        assert_eq!(back.current_page, 2);
        assert_eq!(back.entries[0].1.name(), Some("Widget X"));
    }

    #[test]
    fn test_staleness() {
        let now = now_utc();
        let policy = CheckpointPolicy::default();
        assert!(!policy.is_stale(&sample(now - Duration::minutes(59)), &now));
        assert!(policy.is_stale(&sample(now - Duration::minutes(61)), &now));
    }

    #[test]
    fn test_staleness_follows_last_save() {
        let now = now_utc();
        let policy = CheckpointPolicy::default().with_max_age_secs(60);
        let mut checkpoint = sample(now - Duration::hours(5));
        checkpoint.saved_at = Some(now - Duration::seconds(2));

        assert!(!policy.is_stale(&checkpoint, &now));
        checkpoint.saved_at = Some(now - Duration::seconds(61));
        assert!(policy.is_stale(&checkpoint, &now));
    }

    #[test]
    fn test_minimal_document_decodes() {
        let text = r#"{
            "entries": [["https://shop.test/a/1.html", {"link": "https://shop.test/a/1.html", "name": "Widget X"}]],
            "currentPage": 3,
            "targetQuota": 50,
            "selectorConfig": {"item": ".card"},
            "requestId": "req_min",
            "createdAt": "2026-01-05T10:00:00Z"
        }"#;
        let checkpoint = Checkpoint::from_json_str(text).expect("decode");

        assert_eq!(checkpoint.current_page, 3);
        assert_eq!(checkpoint.strategy, Strategy::Paginated);
        assert_eq!(checkpoint.max_iterations, 20);
        assert_eq!(checkpoint.inter_iteration_delay_ms, 1200);
        assert_eq!(checkpoint.stall_count, 0);
        assert_eq!(checkpoint.min_name_len, 3);
        assert_eq!(checkpoint.saved_at, None);
        assert_eq!(checkpoint.last_saved(), checkpoint.created_at);
    }
}
