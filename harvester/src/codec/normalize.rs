//! Record shape detection and normalization to the grouped shape.

use regex::Regex;
use std::sync::OnceLock;

use crate::record::{Object, Value};
use crate::utils::link_slug;

/// Top-level groups of the canonical record shape, in output order.
pub const GROUP_KEYS: [&str; 8] = [
    "basicInfo",
    "pricing",
    "rating",
    "category",
    "media",
    "content",
    "specifications",
    "metadata",
];

/// Price display used when a record has no price text.
pub const PRICE_FALLBACK: &str = "CONSULT";

const CATEGORY_SEPARATOR: &str = " > ";

/// Flat-shape keys consumed by normalization. Anything else is carried
/// under `metadata`.
const FLAT_KEYS: &[&str] = &[
    "name", "sku", "brand", "webName", "slug", "price", "priceDisplay", "priceValue",
    "currentPrice", "currentPriceValue", "originalPrice", "originalPriceValue", "discount",
    "discountPercent", "packageSize", "prices", "priceObj", "packageOptions", "rating",
    "reviewCount", "commentCount", "reviews", "category", "categoryPath", "categorySlug",
    "image", "images", "description", "ingredients", "usage", "dosage", "adverseEffect",
    "careful", "preservation", "registrationNumber", "origin", "manufacturer", "shelfLife",
    "specifications", "link", "url", "productRanking", "displayCode", "isPublish",
];

/// The shape of one codec input item.
#[derive(Debug, Clone)]
pub enum RecordShape {
    /// Already grouped: has a `basicInfo`, `pricing` or `rating` object, or a
    /// `category` object.
    Grouped(Object),
    /// A legacy flat record.
    Flat(Object),
    /// Not an object at all.
    Scalar(Value),
}

impl RecordShape {
    /// Classifies `value`, copying it so the caller's data is never touched.
    #[must_use]
    pub fn classify(value: &Value) -> Self {
        match value.as_object() {
            Some(obj) if is_grouped(&obj) => Self::Grouped((*obj).clone()),
            Some(obj) => Self::Flat((*obj).clone()),
            None => Self::Scalar(value.clone()),
        }
    }

    /// Converts to the grouped shape. Grouped input is returned unchanged.
    #[must_use]
    pub fn into_grouped(self) -> Value {
        match self {
            Self::Grouped(obj) => Value::Object(obj),
            Self::Flat(obj) => Value::Object(group_flat(&obj)),
            Self::Scalar(value) => value,
        }
    }
}

/// Normalizes one item. Idempotent.
#[must_use]
pub fn normalize(value: &Value) -> Value {
    RecordShape::classify(value).into_grouped()
}

/// Returns true if `obj` carries a group marker.
#[must_use]
pub fn is_grouped(obj: &Object) -> bool {
    ["basicInfo", "pricing", "rating"]
        .iter()
        .any(|key| obj.get(key).is_some_and(Value::is_object))
        || obj.get("category").is_some_and(Value::is_object)
}

/// Derives a file-name slug from a grouped record's category.
///
/// Uses `category.categorySlug` with `/` replaced by `-`, or else the
/// lower-cased, hyphenated `category.categoryPath`.
#[must_use]
pub fn category_slug(grouped: &Value) -> Option<String> {
    let record = grouped.as_object()?;
    let category_value = record.get("category")?;
    let category = category_value.as_object()?;

    if let Some(slug) = category.get("categorySlug").and_then(Value::as_str) {
        if !slug.trim().is_empty() {
            return Some(slug.trim().replace('/', "-"));
        }
    }
    let path = category.get("categoryPath").and_then(Value::as_str)?;
    if path.trim().is_empty() {
        return None;
    }
    let slug = path
        .split(CATEGORY_SEPARATOR)
        .map(|part| whitespace().replace_all(&part.trim().to_lowercase(), "-").into_owned())
        .collect::<Vec<_>>()
        .join("-");
    Some(slug)
}

fn whitespace() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

/// First truthy value among `keys`.
fn pick(obj: &Object, keys: &[&str]) -> Option<Value> {
    keys.iter()
        .filter_map(|key| obj.get(key))
        .find(|value| value.is_truthy())
        .cloned()
}

fn pick_or(obj: &Object, keys: &[&str], default: impl Into<Value>) -> Value {
    pick(obj, keys).unwrap_or_else(|| default.into())
}

fn pick_array(obj: &Object, key: &str) -> Value {
    match obj.get(key) {
        Some(value @ Value::Array(_)) => value.clone(),
        _ => Value::Array(Vec::new()),
    }
}

fn text_group(obj: &Object, keys: &[&str]) -> Object {
    keys.iter()
        .map(|key| ((*key).to_string(), pick_or(obj, &[*key], "")))
        .collect()
}

fn group_flat(flat: &Object) -> Object {
    let link = pick_or(flat, &["link", "url"], "");
    let link_text = link.as_str().unwrap_or_default().to_string();

    let mut basic_info = text_group(flat, &["name", "sku", "brand"]);
    basic_info.insert("webName", pick_or(flat, &["webName", "name"], ""));
    basic_info.insert(
        "slug",
        pick(flat, &["slug"]).unwrap_or_else(|| link_slug(&link_text).unwrap_or_default().into()),
    );

    let mut metadata = Object::new()
        .with("link", link)
        .with("productRanking", pick_or(flat, &["productRanking"], 0_i64))
        .with("displayCode", pick_or(flat, &["displayCode"], 1_i64))
        .with(
            "isPublish",
            match flat.get("isPublish") {
                Some(value) if !value.is_null() => value.clone(),
                _ => Value::Bool(true),
            },
        );
    for (key, value) in flat.iter() {
        if !FLAT_KEYS.contains(&key.as_str()) {
            metadata.insert(key.clone(), value.clone());
        }
    }

    Object::new()
        .with("basicInfo", basic_info)
        .with("pricing", pricing_group(flat))
        .with(
            "rating",
            text_group(flat, &["rating", "reviewCount", "commentCount", "reviews"]),
        )
        .with("category", category_group(flat))
        .with("media", media_group(flat))
        .with(
            "content",
            text_group(
                flat,
                &["description", "ingredients", "usage", "dosage", "adverseEffect", "careful", "preservation"],
            ),
        )
        .with("specifications", specifications_group(flat))
        .with("metadata", metadata)
}

fn pricing_group(flat: &Object) -> Object {
    let display = match pick(flat, &["priceDisplay", "price"]) {
        Some(Value::String(s)) if !s.trim().is_empty() => Value::String(s),
        Some(value) => value
            .scalar_text()
            .filter(|s| !s.trim().is_empty())
            .map_or_else(|| PRICE_FALLBACK.into(), Value::String),
        None => PRICE_FALLBACK.into(),
    };

    Object::new()
        .with("price", pick_or(flat, &["price", "currentPrice"], ""))
        .with("priceDisplay", display)
        .with("priceValue", pick_or(flat, &["priceValue", "currentPriceValue"], 0_i64))
        .with("currentPrice", pick_or(flat, &["currentPrice", "price"], ""))
        .with(
            "currentPriceValue",
            pick_or(flat, &["currentPriceValue", "priceValue"], 0_i64),
        )
        .with("originalPrice", pick_or(flat, &["originalPrice"], ""))
        .with("originalPriceValue", pick_or(flat, &["originalPriceValue"], 0_i64))
        .with("discount", pick_or(flat, &["discount"], 0_i64))
        .with("discountPercent", pick_or(flat, &["discountPercent"], 0_i64))
        .with("packageSize", pick_or(flat, &["packageSize"], ""))
        .with("prices", pick_array(flat, "prices"))
        .with("priceObj", pick_or(flat, &["priceObj"], Value::Null))
        .with("packageOptions", pick_array(flat, "packageOptions"))
}

fn category_group(flat: &Object) -> Object {
    let mut path = pick_or(flat, &["categoryPath"], "");
    let mut slug = pick_or(flat, &["categorySlug"], "");
    let path_text = path.as_str().unwrap_or_default().to_string();

    let category = match flat.get("category") {
        Some(Value::Array(items)) => {
            if !path.is_truthy() {
                let names: Vec<String> = items.iter().filter_map(category_name).collect();
                path = names.join(CATEGORY_SEPARATOR).into();
            }
            if !slug.is_truthy() {
                let slugs: Vec<String> = items
                    .iter()
                    .filter_map(|item| {
                        item.as_object()
                            .and_then(|o| o.get("slug").and_then(Value::as_str).map(str::to_string))
                    })
                    .filter(|s| !s.is_empty())
                    .collect();
                slug = slugs.join("/").into();
            }
            Value::Array(items.clone())
        }
        _ if !path_text.is_empty() => Value::Array(
            path_text
                .split(CATEGORY_SEPARATOR)
                .map(|name| Value::Object(Object::new().with("name", name.trim())))
                .collect(),
        ),
        _ => Value::Array(Vec::new()),
    };

    Object::new()
        .with("category", category)
        .with("categoryPath", path)
        .with("categorySlug", slug)
}

fn category_name(item: &Value) -> Option<String> {
    match item {
        Value::String(name) => Some(name.clone()),
        _ => item
            .as_object()
            .and_then(|o| o.get("name").and_then(Value::as_str).map(str::to_string)),
    }
}

fn media_group(flat: &Object) -> Object {
    let image = pick_or(flat, &["image"], "");
    let images = match flat.get("images") {
        Some(value @ Value::Array(_)) => value.clone(),
        _ if image.is_truthy() => Value::Array(vec![image.clone()]),
        _ => Value::Array(Vec::new()),
    };
    Object::new().with("image", image).with("images", images)
}

fn specifications_group(flat: &Object) -> Object {
    let mut group = text_group(flat, &["registrationNumber", "origin", "manufacturer", "shelfLife"]);
    group.insert(
        "specifications",
        pick_or(flat, &["specifications"], Object::new()),
    );
    group
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn value(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[test]
    fn test_flat_record_is_grouped() {
        let flat = value(json!({
            "name": "Vitamin C 500mg",
            "link": "https://shop.test/vitamin-c-500.html",
            "price": "",
            "image": "https://img.test/1.jpg",
            "categoryPath": "Health > Vitamins",
            "color": "orange"
        }));

        let grouped = normalize(&flat).to_json();

        let keys: Vec<_> = grouped.as_object().expect("object").keys().cloned().collect();
        assert_eq!(keys, GROUP_KEYS.to_vec());
        assert_eq!(grouped["basicInfo"]["webName"], "Vitamin C 500mg");
        assert_eq!(grouped["basicInfo"]["slug"], "vitamin-c-500");
        assert_eq!(grouped["pricing"]["priceDisplay"], PRICE_FALLBACK);
        assert_eq!(grouped["media"]["images"], json!(["https://img.test/1.jpg"]));
        assert_eq!(
            grouped["category"]["category"],
            json!([{"name": "Health"}, {"name": "Vitamins"}])
        );
        assert_eq!(grouped["metadata"]["isPublish"], true);
        assert_eq!(grouped["metadata"]["color"], "orange");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let flat = value(json!({"name": "Widget", "link": "/a/widget.html", "priceDisplay": "12.000đ"}));
        let once = normalize(&flat);
        let twice = normalize(&once);
        assert_eq!(once.to_json(), twice.to_json());
    }

    #[test]
    fn test_grouped_record_untouched() {
        let grouped = value(json!({"pricing": {"priceDisplay": ""}, "extra": 1}));
        assert_eq!(normalize(&grouped).to_json(), grouped.to_json());
    }

    #[test]
    fn test_markers() {
        let is = |j: serde_json::Value| is_grouped(&Object::from(j.as_object().cloned().unwrap_or_default()));
        assert!(is(json!({"rating": {"rating": 4}})));
        assert!(is(json!({"category": {"categoryPath": "A"}})));
        assert!(!is(json!({"rating": 4.5})));
        assert!(!is(json!({"category": [{"name": "A"}]})));
    }

    #[test]
    fn test_category_array_derives_path_and_slug() {
        let flat = value(json!({
            "name": "Widget",
            "category": [{"name": "Home", "slug": "home"}, {"name": "Kitchen", "slug": "kitchen"}]
        }));
        let grouped = normalize(&flat).to_json();
        assert_eq!(grouped["category"]["categoryPath"], "Home > Kitchen");
        assert_eq!(grouped["category"]["categorySlug"], "home/kitchen");
        assert_eq!(category_slug(&normalize(&flat)), Some("home-kitchen".to_string()));
    }

    #[test]
    fn test_category_slug_from_path() {
        let grouped = value(json!({"category": {"categoryPath": "Thực phẩm > Vitamin  Tổng hợp"}}));
        assert_eq!(
            category_slug(&grouped),
            Some("thực-phẩm-vitamin-tổng-hợp".to_string())
        );
        assert_eq!(category_slug(&value(json!({"name": "x"}))), None);
    }

    #[test]
    fn test_scalars_pass_through() {
        assert_eq!(normalize(&Value::from("plain")).to_json(), json!("plain"));
    }
}
