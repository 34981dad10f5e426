//! Periodic scrape scheduler
//!
//! Fires the scrape job on a fixed interval. The loop is a single task that
//! awaits each execution, so runs can never overlap; a firing that would
//! land while a slow run is still in flight is skipped, not queued
//! (`MissedTickBehavior::Skip`). Execution failures are logged and the
//! schedule carries on.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::error::Result;
use crate::scrape::PlaylistScraper;
use crate::store::{MergeOutcome, PlaylistStore};

/// Run one scrape cycle: fetch the page, parse all rows, merge into the log
///
/// # Errors
///
/// Propagates fetch/parse failures and a failed log write; callers treat
/// these as cycle-local.
pub async fn scrape_once(
    scraper: &PlaylistScraper,
    store: &PlaylistStore,
) -> Result<MergeOutcome> {
    let items = scraper.scrape_page().await?;
    let outcome = store.merge(items).await?;
    tracing::info!(
        added = outcome.added,
        total = outcome.total,
        "Scrape cycle merged"
    );
    Ok(outcome)
}

/// Fixed-interval, non-overlapping scrape loop
pub struct ScrapeScheduler {
    scraper: Arc<PlaylistScraper>,
    store: Arc<PlaylistStore>,
    interval: Duration,
}

impl ScrapeScheduler {
    /// Create a scheduler firing every `interval`
    #[must_use]
    pub fn new(scraper: Arc<PlaylistScraper>, store: Arc<PlaylistStore>, interval: Duration) -> Self {
        Self {
            scraper,
            store,
            interval,
        }
    }

    /// Drive the schedule until the shutdown watch flips to true
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // the first tick completes immediately; the schedule starts one
        // interval from now
        timer.tick().await;

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    // a dropped sender counts as shutdown
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Scrape scheduler stopping");
                        break;
                    }
                }
                _ = timer.tick() => {
                    if let Err(e) = scrape_once(&self.scraper, &self.store).await {
                        tracing::warn!(error = %e, transient = e.is_transient(), "Scrape cycle failed");
                    }
                }
            }
        }
    }
}
