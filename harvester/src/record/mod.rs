//! Harvested records and the deduplicating item store.

mod store;
mod value;

pub use store::{AcceptancePolicy, ItemStore, MergeOutcome};
pub use value::{Object, ObjectRef, SharedObject, Value, CIRCULAR_MARKER};

use serde::{Deserialize, Serialize};

/// Field holding the canonical link of a record.
pub const LINK_FIELD: &str = "link";
/// Field holding the display name of a record.
pub const NAME_FIELD: &str = "name";

/// One harvested item.
///
/// A record is a string-keyed map; its identity is the canonical link.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Object);

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record from a JSON object. Returns `None` for non-objects.
    #[must_use]
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Object(map) => Some(Self(Object::from(map))),
            _ => None,
        }
    }

    /// Builder-style field insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key, value);
        self
    }

    /// Returns a field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Sets a field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key, value);
    }

    /// The raw link field, if it is text.
    #[must_use]
    pub fn link(&self) -> Option<&str> {
        self.get(LINK_FIELD).and_then(Value::as_str)
    }

    /// The name field, if it is text.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.get(NAME_FIELD).and_then(Value::as_str)
    }

    /// Borrow the underlying map.
    #[must_use]
    pub fn as_object(&self) -> &Object {
        &self.0
    }

    /// Consume into the underlying map.
    #[must_use]
    pub fn into_object(self) -> Object {
        self.0
    }

    /// Converts to JSON, replacing back-references with [`CIRCULAR_MARKER`].
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        Value::Object(self.0.clone()).to_json()
    }
}

impl From<Object> for Record {
    fn from(object: Object) -> Self {
        Self(object)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Self::Object(record.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_rejects_non_objects() {
        assert!(Record::from_json(json!([1, 2])).is_none());
        assert!(Record::from_json(json!("x")).is_none());
    }

    #[test]
    fn test_accessors() {
        let record = Record::from_json(json!({"link": "https://a/1.html", "name": "Widget"}))
            .expect("object");
        assert_eq!(record.link(), Some("https://a/1.html"));
        assert_eq!(record.name(), Some("Widget"));
    }

    #[test]
    fn test_serde_is_transparent() {
        let record = Record::new().with("name", "Widget").with("price", 12_i64);
        let text = serde_json::to_string(&record).expect("serialize");
        assert_eq!(text, r#"{"name":"Widget","price":12}"#);

        let back: Record = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(back.name(), Some("Widget"));
    }
}
