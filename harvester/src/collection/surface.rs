//! Host collaborator traits: the page being traversed and the extractor.

use async_trait::async_trait;

use crate::record::Record;

/// A control that yields more items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Continuation {
    /// Destination of a hard navigation. `None` means the control acts in place.
    pub target_url: Option<String>,
    /// The control exists but is inert (e.g. a greyed-out next button).
    pub disabled: bool,
    /// Host-side handle for the control, passed back on trigger.
    pub handle: Option<String>,
}

impl Continuation {
    /// An in-place control such as "load more" or a scroll sentinel.
    #[must_use]
    pub fn in_place() -> Self {
        Self::default()
    }

    /// A control that navigates to `target_url`.
    #[must_use]
    pub fn navigate(target_url: impl Into<String>) -> Self {
        Self {
            target_url: Some(target_url.into()),
            ..Self::default()
        }
    }

    /// Marks the control inert.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Attaches a host handle.
    #[must_use]
    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }

    /// Returns true if following this control leaves the page.
    #[must_use]
    pub fn is_hard_navigation(&self) -> bool {
        self.target_url.is_some()
    }
}

/// The page a collection run walks.
///
/// Errors are opaque host failures; the controller turns them into an
/// aborted run with whatever was already collected.
#[async_trait]
pub trait PageSurface: Send + Sync {
    /// Handle to one candidate element.
    type Element: Send + Sync;

    /// The current page address, used to resolve relative links.
    fn address(&self) -> Option<String>;

    /// All currently visible candidate elements.
    async fn candidates(&self) -> anyhow::Result<Vec<Self::Element>>;

    /// Number of visible candidates. Polled while waiting for growth.
    async fn candidate_count(&self) -> anyhow::Result<usize>;

    /// Finds the continuation control, if any.
    async fn find_continuation(
        &self,
        selector_config: &serde_json::Value,
    ) -> anyhow::Result<Option<Continuation>>;

    /// Activates an in-place control.
    async fn trigger(&self, continuation: &Continuation) -> anyhow::Result<()>;

    /// Performs a hard navigation. The current run suspends afterwards.
    async fn navigate(&self, target_url: &str) -> anyhow::Result<()>;
}

/// Turns one element into a candidate record.
///
/// Must not touch collection state. Returning `None` skips the element.
pub trait Extractor<E>: Send + Sync {
    /// Extracts a record from `element`.
    fn extract(&self, element: &E, selector_config: &serde_json::Value) -> Option<Record>;
}

impl<E, F> Extractor<E> for F
where
    F: Fn(&E, &serde_json::Value) -> Option<Record> + Send + Sync,
{
    fn extract(&self, element: &E, selector_config: &serde_json::Value) -> Option<Record> {
        self(element, selector_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_continuation_builders() {
        assert!(!Continuation::in_place().is_hard_navigation());
        let next = Continuation::navigate("https://shop.test/list?page=2").with_handle("a.next");
        assert!(next.is_hard_navigation());
        assert_eq!(next.handle.as_deref(), Some("a.next"));
        assert!(Continuation::in_place().disabled().disabled);
    }

    #[test]
    fn test_closure_extractor() {
        let extractor = |el: &serde_json::Value, config: &serde_json::Value| {
            let key = config["nameKey"].as_str()?;
            Some(Record::new().with("name", el[key].as_str()?))
        };
        let record = extractor
            .extract(&json!({"title": "Widget"}), &json!({"nameKey": "title"}))
            .expect("record");
        assert_eq!(record.name(), Some("Widget"));
        assert!(extractor.extract(&json!({}), &json!({"nameKey": "title"})).is_none());
    }
}
