//! Waiting for in-place content growth after a trigger.

use tokio::time::Instant;
use tracing::debug;

use super::config::GrowthWaitConfig;
use super::surface::PageSurface;
use crate::cancellation::CancellationToken;

/// How a growth wait ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrowthOutcome {
    /// More candidates became visible.
    Grew {
        /// Count before the trigger.
        before: usize,
        /// Count when growth was observed.
        after: usize,
    },
    /// The page address changed.
    AddressChanged,
    /// Nothing observable happened before the timeout. Not an error.
    TimedOut,
    /// Cancellation was requested during the wait.
    Cancelled,
}

/// Polls `surface` until its candidate count exceeds `before` or its address
/// differs from `before_address`, giving up after the configured timeout.
pub async fn wait_for_growth<S>(
    surface: &S,
    before: usize,
    before_address: Option<&str>,
    config: &GrowthWaitConfig,
    cancellation: &CancellationToken,
) -> anyhow::Result<GrowthOutcome>
where
    S: PageSurface + ?Sized,
{
    let deadline = Instant::now() + config.timeout();
    loop {
        if !cancellation.sleep(config.poll_interval()).await {
            return Ok(GrowthOutcome::Cancelled);
        }

        let after = surface.candidate_count().await?;
        if after > before {
            return Ok(GrowthOutcome::Grew { before, after });
        }
        if surface.address().as_deref() != before_address {
            return Ok(GrowthOutcome::AddressChanged);
        }
        if Instant::now() >= deadline {
            debug!(before, timeout_ms = config.timeout_ms, "Content did not grow before timeout");
            return Ok(GrowthOutcome::TimedOut);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Continuation;
    use crate::testing::{numbered_pages, CatalogMode, ScriptedCatalog};

    #[tokio::test(start_paused = true)]
    async fn test_growth_detected() {
        let catalog = ScriptedCatalog::new(CatalogMode::Scrolling, numbered_pages(2, 4));
        let token = CancellationToken::new();
        catalog.trigger(&Continuation::in_place()).await.expect("trigger");

        let outcome = wait_for_growth(&catalog, 4, Some("https://shop.test/list"), &GrowthWaitConfig::default(), &token)
            .await
            .expect("wait");

        assert_eq!(outcome, GrowthOutcome::Grew { before: 4, after: 8 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_not_an_error() {
        let catalog = ScriptedCatalog::new(CatalogMode::Scrolling, numbered_pages(2, 4)).inert_trigger();
        let token = CancellationToken::new();
        let started = Instant::now();

        let outcome = wait_for_growth(&catalog, 4, Some("https://shop.test/list"), &GrowthWaitConfig::default(), &token)
            .await
            .expect("wait");

        assert_eq!(outcome, GrowthOutcome::TimedOut);
        assert!(started.elapsed() >= std::time::Duration::from_millis(4000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_address_change_counts_as_growth() {
        let catalog = ScriptedCatalog::new(CatalogMode::Paginated, numbered_pages(2, 4));
        let token = CancellationToken::new();
        catalog
            .navigate("https://shop.test/list?page=2")
            .await
            .expect("navigate");

        let outcome = wait_for_growth(&catalog, 4, Some("https://shop.test/list?page=1"), &GrowthWaitConfig::default(), &token)
            .await
            .expect("wait");

        assert_eq!(outcome, GrowthOutcome::AddressChanged);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_wait() {
        let catalog = ScriptedCatalog::new(CatalogMode::Scrolling, numbered_pages(1, 4));
        let token = CancellationToken::new();
        token.cancel("stop");

        let outcome = wait_for_growth(&catalog, 4, None, &GrowthWaitConfig::default(), &token)
            .await
            .expect("wait");

        assert_eq!(outcome, GrowthOutcome::Cancelled);
    }
}
