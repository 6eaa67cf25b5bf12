//! Delimited (CSV) rendering: header sampling, cell escaping, row bounds.

use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::io;
use tracing::warn;

use super::flatten::{flatten, FlatRow};
use super::limits::{truncate_with_marker, ExportLimits, TRUNCATION_MARKER};
use super::normalize::normalize;
use crate::errors::ExportError;
use crate::record::Value;

/// Byte-order mark written before the header row.
pub const BOM: &str = "\u{feff}";

/// Normalizes and flattens one item.
#[must_use]
pub fn flatten_item(item: &Value, limits: &ExportLimits) -> FlatRow {
    flatten(&normalize(item), limits)
}

/// Column set of a batch: the union of the keys of the first
/// `header_sample_size` object items, in first-seen order.
///
/// Columns that only appear after the sample are not included.
#[must_use]
pub fn collect_headers(items: &[Value], limits: &ExportLimits) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for item in items
        .iter()
        .take(limits.header_sample_size)
        .filter(|item| item.is_object())
    {
        for key in flatten_item(item, limits).keys() {
            if !headers.iter().any(|h| h == key) {
                headers.push(key.to_string());
            }
        }
    }
    headers
}

/// Cleans one cell: truncates past `max_cell_len` and turns line breaks and
/// tabs into spaces. Quoting and quote doubling happen in the writer.
#[must_use]
pub fn escape_cell(text: &str, limits: &ExportLimits) -> String {
    truncate_with_marker(text, limits.max_cell_len, TRUNCATION_MARKER)
        .chars()
        .map(|c| if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c })
        .collect()
}

/// Projects a flattened row onto `headers`. Missing columns are empty.
#[must_use]
pub fn build_row(headers: &[String], row: &FlatRow, limits: &ExportLimits) -> Vec<String> {
    let cells = row.as_map();
    headers
        .iter()
        .map(|h| {
            cells
                .get(h.as_str())
                .map(|text| escape_cell(text, limits))
                .unwrap_or_default()
        })
        .collect()
}

/// Serialized length of a quoted cell.
fn quoted_len(cell: &str) -> usize {
    cell.chars().count() + cell.matches('"').count() + 2
}

/// Cuts a row whose serialized length would exceed `max_row_len`.
///
/// The cell crossing the bound is truncated with a marker and every later
/// cell is emptied, so the row keeps its column count. Returns true if the
/// row was cut.
pub fn fit_row(cells: &mut [String], max_row_len: usize) -> bool {
    let mut used = 0;
    let mut cut = false;
    for (i, cell) in cells.iter_mut().enumerate() {
        if cut {
            cell.clear();
            continue;
        }
        let separator = usize::from(i > 0);
        let cost = separator + quoted_len(cell);
        if used + cost > max_row_len {
            let room = max_row_len.saturating_sub(used + separator + 2);
            let kept: String = cell.chars().take(room).collect();
            let quotes = kept.matches('"').count();
            let kept: String = kept.chars().take(room.saturating_sub(quotes)).collect();
            *cell = format!("{kept}{TRUNCATION_MARKER}");
            cut = true;
        } else {
            used += cost;
        }
    }
    cut
}

/// Renders a complete delimited document: BOM, quoted header row, then one
/// row per item. Items that fail to render become rows of empty cells.
pub fn render_document(
    headers: &[String],
    items: &[Value],
    limits: &ExportLimits,
) -> Result<String, ExportError> {
    let mut buffer = BOM.as_bytes().to_vec();
    {
        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(&mut buffer);

        let header_cells: Vec<String> = headers.iter().map(|h| escape_cell(h, limits)).collect();
        writer.write_record(&header_cells)?;

        let placeholder = vec![String::new(); headers.len()];
        for (index, item) in items.iter().enumerate() {
            let mut cells = build_row(headers, &flatten_item(item, limits), limits);
            if fit_row(&mut cells, limits.max_row_len) {
                warn!(index, max_row_len = limits.max_row_len, "Row too large, truncated");
            }
            if let Err(e) = writer.write_record(&cells) {
                warn!(index, error = %e, "Failed to write row, emitting placeholder");
                writer.write_record(&placeholder)?;
            }
        }
        writer.flush()?;
    }
    String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn limits() -> ExportLimits {
        ExportLimits::default()
    }

    #[test]
    fn test_escape_cell_collapses_breaks() {
        assert_eq!(escape_cell("a\nb\rc\td", &limits()), "a b c d");
    }

    #[test]
    fn test_escape_cell_truncates() {
        let long = "y".repeat(50_010);
        let cell = escape_cell(&long, &limits());
        assert!(cell.ends_with(TRUNCATION_MARKER));
        assert_eq!(cell.chars().count(), 50_000 + TRUNCATION_MARKER.len());
    }

    #[test]
    fn test_headers_come_from_sample_only() {
        let items: Vec<Value> = vec![
            Value::from(json!({"pricing": {"price": 1}})),
            Value::from(json!("not an object")),
            Value::from(json!({"pricing": {"price": 2, "tier": "b"}})),
            Value::from(json!({"pricing": {"late": true}})),
        ];
        let headers = collect_headers(&items, &limits().with_header_sample_size(3));
        assert_eq!(headers, vec!["pricing.price", "pricing.tier"]);
    }

    #[test]
    fn test_fit_row_keeps_column_count() {
        let mut cells = vec!["aaaa".to_string(), "bbbbbbbbbb".to_string(), "c".to_string()];
        assert!(fit_row(&mut cells, 12));
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0], "aaaa");
        assert!(cells[1].ends_with(TRUNCATION_MARKER));
        assert_eq!(cells[2], "");
    }

    #[test]
    fn test_fit_row_untouched_when_short() {
        let mut cells = vec!["a".to_string(), "b".to_string()];
        assert!(!fit_row(&mut cells, 100));
        assert_eq!(cells, vec!["a", "b"]);
    }

    #[test]
    fn test_document_layout() {
        let items = vec![Value::from(json!({"pricing": {"price": "5", "note": "say \"hi\""}}))];
        let headers = collect_headers(&items, &limits());
        let doc = render_document(&headers, &items, &limits()).expect("render");

        assert!(doc.starts_with(BOM));
        let lines: Vec<&str> = doc.trim_start_matches(BOM).lines().collect();
        assert_eq!(lines[0], r#""pricing.price","pricing.note""#);
        assert_eq!(lines[1], r#""5","say ""hi""""#);
    }
}
