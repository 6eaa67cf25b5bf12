//! Loosely-typed record values.
//!
//! Harvested records are string-keyed maps of scalars, arrays and nested
//! objects. Nested objects are normally owned, but a host may hand over
//! shared nodes (`Value::Shared`) that alias each other, so a record graph
//! can contain cycles. Everything that walks a value graph threads an
//! identity set through the recursion and emits [`CIRCULAR_MARKER`] instead
//! of revisiting a node already on the active path.

use parking_lot::{RwLock, RwLockReadGuard};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::ops::Deref;
use std::sync::Arc;

/// Marker written where a value graph refers back to one of its ancestors.
pub const CIRCULAR_MARKER: &str = "[Circular]";

/// A single field value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Missing / null.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Number, kept in its JSON representation.
    Number(serde_json::Number),
    /// Text.
    String(String),
    /// Ordered list.
    Array(Vec<Value>),
    /// Owned nested object.
    Object(Object),
    /// Shared nested object; may alias other nodes, including ancestors.
    Shared(SharedObject),
}

impl Value {
    /// Returns true for `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the string slice for `String` values.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the elements of an `Array`.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns a read view of an owned or shared object.
    #[must_use]
    pub fn as_object(&self) -> Option<ObjectRef<'_>> {
        match self {
            Self::Object(obj) => Some(ObjectRef::Owned(obj)),
            Self::Shared(shared) => Some(ObjectRef::Shared(shared.read())),
            _ => None,
        }
    }

    /// Returns true for owned or shared objects.
    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_) | Self::Shared(_))
    }

    /// Returns the numeric value as `f64`, if this is a number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// JavaScript-style truthiness, used for field fallbacks.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
            Self::String(s) => !s.is_empty(),
            Self::Array(_) | Self::Object(_) | Self::Shared(_) => true,
        }
    }

    /// Renders a scalar as text. Returns `None` for arrays and objects.
    #[must_use]
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Self::Null => Some(String::new()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Number(n) => Some(n.to_string()),
            Self::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Identity of the object node behind this value, if any.
    ///
    /// Owned objects are identified by address, which is stable for as long
    /// as the value is borrowed.
    #[must_use]
    pub fn node_id(&self) -> Option<usize> {
        match self {
            Self::Object(obj) => Some(obj as *const Object as usize),
            Self::Shared(shared) => Some(shared.node_id()),
            _ => None,
        }
    }

    /// Converts to a `serde_json::Value`, replacing back-references with
    /// [`CIRCULAR_MARKER`].
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut visiting = HashSet::new();
        self.to_json_guarded(&mut visiting)
    }

    pub(crate) fn to_json_guarded(&self, visiting: &mut HashSet<usize>) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Value::Number(n.clone()),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Array(items) => serde_json::Value::Array(
                items.iter().map(|v| v.to_json_guarded(visiting)).collect(),
            ),
            Self::Object(_) | Self::Shared(_) => {
                let Some(id) = self.node_id() else {
                    return serde_json::Value::Null;
                };
                if !visiting.insert(id) {
                    return serde_json::Value::String(CIRCULAR_MARKER.to_string());
                }
                let map = self
                    .as_object()
                    .map(|obj| {
                        obj.iter()
                            .map(|(k, v)| (k.clone(), v.to_json_guarded(visiting)))
                            .collect::<serde_json::Map<_, _>>()
                    })
                    .unwrap_or_default();
                visiting.remove(&id);
                serde_json::Value::Object(map)
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => Self::Object(Object::from(map)),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value).map_or(Self::Null, Self::Number)
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Self::Object(value)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Self::from)
    }
}

/// An insertion-ordered string-keyed map.
#[derive(Debug, Clone, Default)]
pub struct Object {
    entries: Vec<(String, Value)>,
}

impl Object {
    /// Creates an empty object.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Inserts or replaces `key`, keeping the original position on replace.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Iterates keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Converts into a shared node.
    #[must_use]
    pub fn into_shared(self) -> SharedObject {
        SharedObject::new(self)
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Object {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            entries: map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
        }
    }
}

impl FromIterator<(String, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut obj = Self::new();
        for (k, v) in iter {
            obj.insert(k, v);
        }
        obj
    }
}

impl Serialize for Object {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Value::Object(self.clone()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Object {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = serde_json::Map::deserialize(deserializer)?;
        Ok(Self::from(map))
    }
}

/// A reference-counted object node that may be aliased.
#[derive(Clone, Default)]
pub struct SharedObject(Arc<RwLock<Object>>);

// Printing the contents could recurse forever on a cyclic graph.
impl std::fmt::Debug for SharedObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedObject")
            .field("node_id", &self.node_id())
            .field("len", &self.read().len())
            .finish()
    }
}

impl SharedObject {
    /// Wraps an object in a shared node.
    #[must_use]
    pub fn new(object: Object) -> Self {
        Self(Arc::new(RwLock::new(object)))
    }

    /// Read access. Recursive reads are allowed while walking cyclic graphs.
    #[must_use]
    pub fn read(&self) -> RwLockReadGuard<'_, Object> {
        self.0.read_recursive()
    }

    /// Inserts a field into the shared node.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.write().insert(key, value);
    }

    /// Identity of this node.
    #[must_use]
    pub fn node_id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

/// Read view over an owned or shared object.
pub enum ObjectRef<'a> {
    /// Borrowed owned object.
    Owned(&'a Object),
    /// Read guard on a shared node.
    Shared(RwLockReadGuard<'a, Object>),
}

impl Deref for ObjectRef<'_> {
    type Target = Object;

    fn deref(&self) -> &Object {
        match self {
            Self::Owned(obj) => obj,
            Self::Shared(guard) => &**guard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_preserves_insertion_order() {
        let obj = Object::new().with("b", 1_i64).with("a", 2_i64).with("b", 3_i64);
        let keys: Vec<_> = obj.keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(obj.get("b").and_then(Value::as_f64), Some(3.0));
    }

    #[test]
    fn test_from_json_round_trip() {
        let source = json!({"name": "Widget", "tags": ["a", "b"], "price": {"value": 10}});
        let value = Value::from(source.clone());
        assert_eq!(value.to_json(), source);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::from(0_i64).is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(Value::Array(vec![]).is_truthy());
    }

    #[test]
    fn test_self_reference_serializes_with_marker() {
        let node = Object::new().with("name", "loop").into_shared();
        node.insert("me", Value::Shared(node.clone()));

        let json = Value::Shared(node).to_json();
        assert_eq!(json, json!({"name": "loop", "me": CIRCULAR_MARKER}));
    }

    #[test]
    fn test_shared_sibling_is_not_circular() {
        let leaf = Object::new().with("x", 1_i64).into_shared();
        let root = Object::new()
            .with("left", Value::Shared(leaf.clone()))
            .with("right", Value::Shared(leaf));

        let json = Value::Object(root).to_json();
        assert_eq!(json, json!({"left": {"x": 1}, "right": {"x": 1}}));
    }
}
