//! Link canonicalization.

use regex::Regex;
use std::sync::OnceLock;
use url::Url;

const IGNORED_SCHEMES: [&str; 4] = ["#", "javascript:", "mailto:", "tel:"];

/// Resolves `raw` to an absolute, fragment-free link.
///
/// Relative links are joined onto `base`. When neither `raw` nor `base`
/// parse as URLs the trimmed input is used as-is, so hosts that key records
/// by opaque identifiers still deduplicate. Returns `None` for empty input
/// and for in-page, script, mail and phone links.
#[must_use]
pub fn canonical_link(raw: &str, base: Option<&str>) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let lowered = raw.to_ascii_lowercase();
    if IGNORED_SCHEMES.iter().any(|p| lowered.starts_with(p)) {
        return None;
    }

    let resolved = Url::parse(raw).ok().or_else(|| {
        base.and_then(|b| Url::parse(b).ok())
            .and_then(|b| b.join(raw).ok())
    });

    match resolved {
        Some(mut url) => {
            url.set_fragment(None);
            Some(url.to_string())
        }
        None => Some(raw.to_string()),
    }
}

fn slug_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"/([^/]+)\.html$").expect("valid slug regex"))
}

/// Extracts the `<slug>` from a link ending in `/<slug>.html`.
#[must_use]
pub fn link_slug(link: &str) -> Option<String> {
    slug_pattern()
        .captures(link)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_link_drops_fragment() {
        assert_eq!(
            canonical_link("https://shop.test/p/1.html#top", None),
            Some("https://shop.test/p/1.html".to_string())
        );
    }

    #[test]
    fn test_relative_link_resolves_against_base() {
        assert_eq!(
            canonical_link("a/1.html", Some("https://shop.test/cat/list")),
            Some("https://shop.test/cat/a/1.html".to_string())
        );
    }

    #[test]
    fn test_relative_link_without_base_kept() {
        assert_eq!(canonical_link(" a/1.html ", None), Some("a/1.html".to_string()));
    }

    #[test]
    fn test_ignored_links() {
        assert_eq!(canonical_link("", None), None);
        assert_eq!(canonical_link("#reviews", None), None);
        assert_eq!(canonical_link("javascript:void(0)", None), None);
        assert_eq!(canonical_link("mailto:a@b.c", None), None);
    }

    #[test]
    fn test_link_slug() {
        assert_eq!(
            link_slug("https://shop.test/thuoc/vitamin-c.html"),
            Some("vitamin-c".to_string())
        );
        assert_eq!(link_slug("https://shop.test/thuoc/"), None);
    }
}
