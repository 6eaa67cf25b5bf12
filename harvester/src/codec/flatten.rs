//! Recursive flattening of nested values into dotted-path rows.

use std::collections::{HashMap, HashSet};

use super::limits::{truncate_with_marker, ExportLimits, ELLIPSIS};
use crate::record::{Value, CIRCULAR_MARKER};

/// Column used for a value that is not an object.
pub const VALUE_COLUMN: &str = "value";

/// One flattened record: dotted-path keys to text, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatRow {
    cells: Vec<(String, String)>,
}

impl FlatRow {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a cell. A repeated key keeps its first position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.cells.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.cells.push((key, value));
        }
    }

    /// Returns a cell.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(k, _)| k.as_str())
    }

    /// Iterates cells in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if there are no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Key-to-text lookup table.
    #[must_use]
    pub fn as_map(&self) -> HashMap<&str, &str> {
        self.iter().collect()
    }
}

/// Flattens one item.
///
/// Objects become one cell per leaf, keyed by dotted path. Anything else
/// becomes a single [`VALUE_COLUMN`] cell.
#[must_use]
pub fn flatten(value: &Value, limits: &ExportLimits) -> FlatRow {
    let mut row = FlatRow::new();
    if value.is_object() {
        let mut visiting = HashSet::new();
        flatten_node(value, "", 0, &mut visiting, limits, &mut row);
    } else {
        row.insert(VALUE_COLUMN, scalar_cell(value, limits));
    }
    row
}

/// Removes a node from the active path when its subtree is done, including
/// on unwind.
struct VisitGuard<'a> {
    visiting: &'a mut HashSet<usize>,
    id: usize,
}

impl<'a> VisitGuard<'a> {
    fn enter(visiting: &'a mut HashSet<usize>, id: usize) -> Self {
        visiting.insert(id);
        Self { visiting, id }
    }

    fn visiting(&mut self) -> &mut HashSet<usize> {
        &mut *self.visiting
    }
}

impl Drop for VisitGuard<'_> {
    fn drop(&mut self) {
        self.visiting.remove(&self.id);
    }
}

fn column(prefix: &str) -> &str {
    if prefix.is_empty() {
        VALUE_COLUMN
    } else {
        prefix
    }
}

fn flatten_node(
    node: &Value,
    prefix: &str,
    depth: usize,
    visiting: &mut HashSet<usize>,
    limits: &ExportLimits,
    row: &mut FlatRow,
) {
    let Some(id) = node.node_id() else {
        return;
    };
    if visiting.contains(&id) {
        row.insert(column(prefix), CIRCULAR_MARKER);
        return;
    }
    if depth > limits.max_depth {
        let json = node.to_json_guarded(visiting).to_string();
        row.insert(
            column(prefix),
            truncate_with_marker(&json, limits.max_subtree_json_len, ELLIPSIS),
        );
        return;
    }
    let Some(object) = node.as_object() else {
        return;
    };

    let mut guard = VisitGuard::enter(visiting, id);
    for (key, value) in object.iter().take(limits.max_keys_per_object) {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Null => row.insert(path, ""),
            Value::Array(items) => {
                let text = render_array(key, items, guard.visiting(), limits);
                row.insert(path, text);
            }
            Value::Object(_) | Value::Shared(_) => {
                flatten_node(value, &path, depth + 1, guard.visiting(), limits, row);
            }
            _ => row.insert(path, scalar_cell(value, limits)),
        }
    }
}

fn scalar_cell(value: &Value, limits: &ExportLimits) -> String {
    let text = value.scalar_text().unwrap_or_default();
    truncate_with_marker(&text, limits.max_scalar_len, ELLIPSIS)
}

fn item_text(item: &Value, visiting: &mut HashSet<usize>) -> String {
    item.scalar_text()
        .unwrap_or_else(|| item.to_json_guarded(visiting).to_string())
}

fn array_json(items: &[Value], visiting: &mut HashSet<usize>) -> String {
    serde_json::Value::Array(items.iter().map(|v| v.to_json_guarded(visiting)).collect())
        .to_string()
}

fn render_array(
    key: &str,
    items: &[Value],
    visiting: &mut HashSet<usize>,
    limits: &ExportLimits,
) -> String {
    match key {
        "packageOptions" if !items.is_empty() => items
            .iter()
            .map(package_option_summary)
            .collect::<Vec<_>>()
            .join(" | "),
        "images" => {
            let joined = items
                .iter()
                .map(|item| item_text(item, visiting))
                .collect::<Vec<_>>()
                .join(" | ");
            truncate_with_marker(&joined, limits.max_array_json_len, ELLIPSIS)
        }
        "category" => truncate_with_marker(&array_json(items, visiting), limits.max_array_json_len, ELLIPSIS),
        _ if items.len() > limits.max_array_items => format!("[Array({})]", items.len()),
        _ => truncate_with_marker(&array_json(items, visiting), limits.max_array_json_len, ELLIPSIS),
    }
}

/// `unitDisplay priceDisplay (specification)`, skipping missing parts.
fn package_option_summary(option: &Value) -> String {
    let Some(option) = option.as_object() else {
        return option.scalar_text().unwrap_or_default();
    };
    let mut parts = Vec::new();
    for key in ["unitDisplay", "priceDisplay"] {
        if let Some(text) = option.get(key).filter(|v| v.is_truthy()).and_then(Value::scalar_text) {
            parts.push(text);
        }
    }
    if let Some(spec) = option
        .get("specification")
        .filter(|v| v.is_truthy())
        .and_then(Value::scalar_text)
    {
        parts.push(format!("({spec})"));
    }
    parts.join(" ")
}
