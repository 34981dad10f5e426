//! Push ticker
//!
//! On every tick: fetch the now-playing snapshot, compute the listener
//! estimate, and broadcast. The listener count goes out on every successful
//! cycle; the song payload only when the song changed or the refresh window
//! elapsed, so song subscribers see change events with an occasional
//! keep-alive rather than a constant stream.
//!
//! A failed snapshot fetch skips the whole cycle; nothing stale is pushed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::estimator::ListenerEstimator;
use crate::models::{format_last_update, ListenersPayload, SongPayload};
use crate::scrape::PlaylistScraper;
use crate::server::registry::BroadcastRegistry;

/// Decide whether this cycle's song payload should go out
///
/// True when nothing was ever sent, when the song key differs from the last
/// sent one, or when the refresh window since the last send has elapsed.
#[must_use]
pub fn should_send_song(
    current_key: &str,
    last_key: Option<&str>,
    since_last_send: Option<Duration>,
    refresh: Duration,
) -> bool {
    match last_key {
        None => true,
        Some(last) if last != current_key => true,
        Some(_) => since_last_send.map_or(true, |elapsed| elapsed >= refresh),
    }
}

/// Fixed-interval broadcast loop
pub struct PushTicker {
    scraper: Arc<PlaylistScraper>,
    estimator: Arc<ListenerEstimator>,
    registry: Arc<BroadcastRegistry>,
    interval: Duration,
    song_refresh: Duration,
}

impl PushTicker {
    /// Create a ticker firing every `interval`, re-sending an unchanged song
    /// at most every `song_refresh`
    #[must_use]
    pub fn new(
        scraper: Arc<PlaylistScraper>,
        estimator: Arc<ListenerEstimator>,
        registry: Arc<BroadcastRegistry>,
        interval: Duration,
        song_refresh: Duration,
    ) -> Self {
        Self {
            scraper,
            estimator,
            registry,
            interval,
            song_refresh,
        }
    }

    /// Drive the ticker until the shutdown watch flips to true
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        timer.tick().await;

        let mut last_song_key: Option<String> = None;
        let mut last_song_sent: Option<Instant> = None;

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    // a dropped sender counts as shutdown
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Push ticker stopping");
                        break;
                    }
                }
                _ = timer.tick() => {
                    self.cycle(&mut last_song_key, &mut last_song_sent).await;
                }
            }
        }
    }

    /// Run one broadcast cycle
    async fn cycle(&self, last_song_key: &mut Option<String>, last_song_sent: &mut Option<Instant>) {
        let now_playing = match self.scraper.fetch_now_playing().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "Ticker cycle skipped");
                return;
            }
        };

        let song_key = now_playing.song_key();
        let now = Local::now();
        let listeners = self.estimator.estimate(now, &song_key, None);

        self.registry
            .broadcast_listeners(&ListenersPayload {
                last_update: format_last_update(now),
                listeners,
            })
            .await;

        let elapsed = last_song_sent.map(|sent| sent.elapsed());
        if should_send_song(
            &song_key,
            last_song_key.as_deref(),
            elapsed,
            self.song_refresh,
        ) {
            self.registry
                .broadcast_song(&SongPayload::from_now_playing(&now_playing, now))
                .await;
            *last_song_key = Some(song_key);
            *last_song_sent = Some(Instant::now());
        }
    }
}
