//! Scripted catalog surface.

use anyhow::bail;
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::collection::{Continuation, PageSurface};

/// How the scripted catalog reveals further pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogMode {
    /// Each page is its own address; the next-page control navigates.
    Paginated,
    /// Triggering "load more" appends the next page in place.
    Scrolling,
}

#[derive(Debug, Default)]
struct CatalogState {
    /// Paginated: index of the loaded page. Scrolling: pages revealed minus one.
    page: usize,
    navigations: Vec<String>,
    triggers: usize,
}

/// An in-memory listing that behaves like a catalog page.
///
/// Paginated catalogs live at `{base}?page=N` (1-based). The state is shared
/// across controllers, so a controller built after a navigation sees the
/// page the previous one navigated to, as a reloaded document would.
#[derive(Debug)]
pub struct ScriptedCatalog {
    mode: CatalogMode,
    base_url: String,
    pages: Vec<Vec<serde_json::Value>>,
    state: Mutex<CatalogState>,
    endless: bool,
    disabled_at_end: bool,
    inert_trigger: bool,
    fail_on_page: Option<usize>,
}

impl ScriptedCatalog {
    /// Creates a catalog at `https://shop.test/list`.
    #[must_use]
    pub fn new(mode: CatalogMode, pages: Vec<Vec<serde_json::Value>>) -> Self {
        Self {
            mode,
            base_url: "https://shop.test/list".to_string(),
            pages,
            state: Mutex::new(CatalogState::default()),
            endless: false,
            disabled_at_end: false,
            inert_trigger: false,
            fail_on_page: None,
        }
    }

    /// Keeps offering an in-place control after the last page.
    #[must_use]
    pub fn endless(mut self) -> Self {
        self.endless = true;
        self
    }

    /// Offers a disabled control after the last page instead of none.
    #[must_use]
    pub fn disabled_at_end(mut self) -> Self {
        self.disabled_at_end = true;
        self
    }

    /// Makes in-place triggers reveal nothing.
    #[must_use]
    pub fn inert_trigger(mut self) -> Self {
        self.inert_trigger = true;
        self
    }

    /// Fails candidate listing on the given 0-based page.
    #[must_use]
    pub fn fail_on_page(mut self, page: usize) -> Self {
        self.fail_on_page = Some(page);
        self
    }

    /// Address of a 0-based page.
    #[must_use]
    pub fn page_url(&self, page: usize) -> String {
        match self.mode {
            CatalogMode::Paginated => format!("{}?page={}", self.base_url, page + 1),
            CatalogMode::Scrolling => self.base_url.clone(),
        }
    }

    /// The current 0-based page.
    #[must_use]
    pub fn current_page(&self) -> usize {
        self.state.lock().page
    }

    /// Addresses navigated to, in order.
    #[must_use]
    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().navigations.clone()
    }

    /// Number of in-place triggers.
    #[must_use]
    pub fn trigger_count(&self) -> usize {
        self.state.lock().triggers
    }

    fn visible(&self, page: usize) -> Vec<serde_json::Value> {
        match self.mode {
            CatalogMode::Paginated => self.pages.get(page).cloned().unwrap_or_default(),
            CatalogMode::Scrolling => self
                .pages
                .iter()
                .take(page + 1)
                .flatten()
                .cloned()
                .collect(),
        }
    }

    fn has_next(&self, page: usize) -> bool {
        page + 1 < self.pages.len()
    }
}

#[async_trait]
impl PageSurface for ScriptedCatalog {
    type Element = serde_json::Value;

    fn address(&self) -> Option<String> {
        Some(self.page_url(self.current_page()))
    }

    async fn candidates(&self) -> anyhow::Result<Vec<serde_json::Value>> {
        let page = self.current_page();
        if self.fail_on_page == Some(page) {
            bail!("listing failed to render on page {}", page + 1);
        }
        Ok(self.visible(page))
    }

    async fn candidate_count(&self) -> anyhow::Result<usize> {
        Ok(self.visible(self.current_page()).len())
    }

    async fn find_continuation(
        &self,
        _selector_config: &serde_json::Value,
    ) -> anyhow::Result<Option<Continuation>> {
        let page = self.current_page();
        let continuation = match self.mode {
            CatalogMode::Paginated if self.has_next(page) => {
                Some(Continuation::navigate(self.page_url(page + 1)).with_handle("a.next"))
            }
            CatalogMode::Scrolling if self.has_next(page) || self.endless => {
                Some(Continuation::in_place().with_handle("button.load-more"))
            }
            _ if self.disabled_at_end => Some(Continuation::in_place().disabled()),
            _ => None,
        };
        Ok(continuation)
    }

    async fn trigger(&self, _continuation: &Continuation) -> anyhow::Result<()> {
        let mut state = self.state.lock();
        state.triggers += 1;
        if !self.inert_trigger && self.has_next(state.page) {
            state.page += 1;
        }
        Ok(())
    }

    async fn navigate(&self, target_url: &str) -> anyhow::Result<()> {
        let Some(page) = (0..self.pages.len()).find(|&p| self.page_url(p) == target_url) else {
            bail!("unknown page {target_url}");
        };
        let mut state = self.state.lock();
        state.page = page;
        state.navigations.push(target_url.to_string());
        Ok(())
    }
}
