//! End-to-end export scenarios.

#[cfg(test)]
mod tests {
    use crate::codec::{ExportLimits, ExportOptions, Exporter, BOM};
    use crate::record::{Object, Record, SharedObject, Value, CIRCULAR_MARKER};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn product(n: usize) -> Value {
        Value::from(json!({
            "basicInfo": {"name": format!("Widget {n}"), "sku": format!("SKU-{n}")},
            "pricing": {"priceDisplay": format!("{n}.000đ")},
            "metadata": {"link": format!("https://shop.test/p/widget-{n}.html")}
        }))
    }

    fn parse(content: &str) -> (Vec<String>, Vec<Vec<String>>) {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(content.trim_start_matches(BOM).as_bytes());
        let headers = reader
            .headers()
            .expect("headers")
            .iter()
            .map(str::to_string)
            .collect();
        let rows = reader
            .records()
            .map(|r| r.expect("row").iter().map(str::to_string).collect())
            .collect();
        (headers, rows)
    }

    #[test]
    fn test_chunk_boundaries() {
        let items: Vec<Value> = (1..=250).map(product).collect();
        let files = Exporter::default().export(&items).expect("export");

        let names: Vec<_> = files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "scraped-data-1-100.csv",
                "scraped-data-101-200.csv",
                "scraped-data-201-250.csv"
            ]
        );
        let counts: Vec<_> = files.iter().map(|f| parse(&f.content).1.len()).collect();
        assert_eq!(counts, vec![100, 100, 50]);
        assert_eq!(files[2].range, Some((201, 250)));
    }

    #[test]
    fn test_chunk_names_shift_by_skip_and_carry_category_slug() {
        let mut items: Vec<Value> = (1..=150).map(product).collect();
        items[0] = Value::from(json!({
            "basicInfo": {"name": "Widget 1"},
            "category": {"categorySlug": "home/kitchen"}
        }));
        let options = ExportOptions::default().with_skip_offset(40);
        let files = Exporter::new(options).export(&items).expect("export");

        assert_eq!(files[0].filename, "scraped-data-home-kitchen-41-140.csv");
        assert_eq!(files[1].filename, "scraped-data-home-kitchen-141-190.csv");
    }

    #[test]
    fn test_every_chunk_repeats_first_sample_headers() {
        let mut items: Vec<Value> = (1..=120).map(product).collect();
        items[110] = Value::from(json!({"basicInfo": {"name": "Late", "color": "red"}}));
        let files = Exporter::default().export(&items).expect("export");

        let (first, _) = parse(&files[0].content);
        let (second, rows) = parse(&files[1].content);
        assert_eq!(first, second);
        assert!(!second.contains(&"basicInfo.color".to_string()));
        assert!(rows.iter().any(|r| r.contains(&"Late".to_string())));
    }

    #[test]
    fn test_column_outside_sample_is_dropped() {
        let mut items: Vec<Value> = (1..=60).map(product).collect();
        items[49] = Value::from(json!({
            "basicInfo": {"name": "Widget 50"},
            "pricing": {"priceDisplay": "50.000đ"},
            "X": "only here"
        }));
        let files = Exporter::default().export(&items).expect("export");

        let (headers, rows) = parse(&files[0].content);
        assert!(!headers.iter().any(|h| h == "X"));
        assert!(rows.iter().all(|r| !r.contains(&"only here".to_string())));
        assert_eq!(rows.len(), 60);
    }

    #[test]
    fn test_escaping_round_trip() {
        let original = "12\" screen\nwith \"quotes\"";
        let items = vec![Value::from(json!({"basicInfo": {"name": original}}))];
        let files = Exporter::default().export(&items).expect("export");

        assert!(files[0].content.contains(r#""12"" screen with ""quotes""""#));
        let (headers, rows) = parse(&files[0].content);
        assert_eq!(headers, vec!["basicInfo.name"]);
        assert_eq!(rows[0][0], original.replace('\n', " "));
    }

    #[test]
    fn test_cyclic_record_exports() {
        let node = SharedObject::new(Object::new().with("origin", "VN"));
        node.insert("parent", Value::Shared(node.clone()));
        let record = Record::new()
            .with("basicInfo", Object::new().with("name", "Looped"))
            .with("specifications", Value::Shared(node));

        let files = Exporter::default().export_records(&[record]).expect("export");

        let (headers, rows) = parse(&files[0].content);
        let at = |column: &str| {
            let i = headers.iter().position(|h| h == column).expect("column");
            rows[0][i].clone()
        };
        assert_eq!(at("specifications.origin"), "VN");
        assert_eq!(at("specifications.parent"), CIRCULAR_MARKER);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let items = vec![Value::from(json!({"name": "Flat widget", "link": "/a/flat.html"}))];
        let before = items[0].to_json();
        Exporter::default().export(&items).expect("export");
        assert_eq!(items[0].to_json(), before);
    }

    #[test]
    fn test_flat_records_export_in_grouped_columns() {
        let items = vec![Value::from(json!({"name": "Flat widget", "link": "https://shop.test/a/flat.html"}))];
        let files = Exporter::default().export(&items).expect("export");

        let (headers, rows) = parse(&files[0].content);
        let name = headers.iter().position(|h| h == "basicInfo.name").expect("name column");
        let slug = headers.iter().position(|h| h == "basicInfo.slug").expect("slug column");
        let price = headers.iter().position(|h| h == "pricing.priceDisplay").expect("price column");
        assert_eq!(rows[0][name], "Flat widget");
        assert_eq!(rows[0][slug], "flat");
        assert_eq!(rows[0][price], "CONSULT");
    }

    #[test]
    fn test_oversized_row_stays_parseable() {
        let limits = ExportLimits::default().with_max_row_len(40);
        let items = vec![Value::from(json!({
            "basicInfo": {"name": "a".repeat(30), "sku": "b".repeat(30), "brand": "c"}
        }))];
        let files = Exporter::new(ExportOptions::default().with_limits(limits))
            .export(&items)
            .expect("export");

        let (headers, rows) = parse(&files[0].content);
        assert_eq!(rows[0].len(), headers.len());
        assert!(rows[0][1].ends_with("...[truncated]"));
        assert_eq!(rows[0][2], "");
    }
}
