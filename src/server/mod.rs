//! HTTP/WebSocket server
//!
//! Wires the playlist store, the scraper, the estimator and the broadcast
//! registry into an axum application, and owns the two background loops
//! (scrape scheduler and push ticker). The server's connection tasks are
//! the only place socket I/O happens; the background loops communicate with
//! them exclusively through the registry's queues.

pub mod api;
pub mod audit;
pub mod registry;
pub mod ws;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::estimator::ListenerEstimator;
use crate::scrape::PlaylistScraper;
use crate::store::PlaylistStore;
use crate::tasks::{PushTicker, ScrapeScheduler};

use audit::ConnectionAudit;
use registry::BroadcastRegistry;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: Arc<Config>,

    /// Playlist log store
    pub store: Arc<PlaylistStore>,

    /// Push client registry
    pub registry: Arc<BroadcastRegistry>,

    /// Playlist page scraper
    pub scraper: Arc<PlaylistScraper>,

    /// Listener estimator
    pub estimator: Arc<ListenerEstimator>,

    /// Server start time
    pub start_time: Instant,

    /// Shutdown flag; flips to true once, connection tasks exit on it
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    /// Path of the connection audit file
    #[must_use]
    pub fn registry_audit_path(&self) -> &Path {
        &self.config.storage.audit_path
    }
}

// ============================================================================
// Server
// ============================================================================

/// Main radiopulse server
pub struct Server {
    config: Arc<Config>,
    state: AppState,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl Server {
    /// Create a server from validated configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error before any scheduling begins when the
    /// configuration is invalid, or a fetch error when the HTTP client
    /// cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| Error::config(e.to_string()))?;

        let config = Arc::new(config);

        let store = Arc::new(PlaylistStore::new(
            &config.storage.playlist_path,
            config.storage.playlist_limit,
            &config.scrape.station,
        ));
        let registry = Arc::new(BroadcastRegistry::new(ConnectionAudit::new(
            &config.storage.audit_path,
        )));
        let scraper = Arc::new(PlaylistScraper::new(&config.scrape)?);
        let estimator = Arc::new(ListenerEstimator::new(config.estimator.clone()));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let state = AppState {
            config: config.clone(),
            store,
            registry,
            scraper,
            estimator,
            start_time: Instant::now(),
            shutdown: shutdown_rx,
        };

        Ok(Self {
            config,
            state,
            shutdown_tx: Arc::new(shutdown_tx),
        })
    }

    /// Get the application state
    #[must_use]
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes and configured layers
    #[must_use]
    pub fn build_router(&self) -> Router {
        let mut router = api::create_router(self.state.clone());

        if self.config.server.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.config.server.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Start the server and run until the shutdown signal resolves
    ///
    /// The signal flips the shutdown flag, which stops the scheduler and
    /// ticker loops and makes every live connection task close its socket,
    /// so graceful shutdown does not wait on idle push connections.
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let router = self.build_router();
        let addr = self.config.server.bind_address;

        self.start_background_tasks();

        tracing::info!(%addr, "Starting radiopulse server");

        let shutdown_tx = self.shutdown_tx.clone();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            shutdown_signal.await;
            let _ = shutdown_tx.send(true);
        })
        .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Spawn the scrape scheduler and push ticker loops
    fn start_background_tasks(&self) {
        let shutdown = self.state.shutdown.clone();
        let scheduler = ScrapeScheduler::new(
            self.state.scraper.clone(),
            self.state.store.clone(),
            self.config.scrape_interval(),
        );
        tokio::spawn(scheduler.run(shutdown.clone()));
        tracing::info!(
            interval_secs = self.config.scrape.scrape_interval_secs,
            "Scrape scheduler started"
        );

        let ticker = PushTicker::new(
            self.state.scraper.clone(),
            self.state.estimator.clone(),
            self.state.registry.clone(),
            self.config.push_interval(),
            std::time::Duration::from_secs(self.config.scrape.song_refresh_secs),
        );
        tokio::spawn(ticker.run(shutdown));
        tracing::info!(
            push_secs = self.config.scrape.push_interval_secs,
            song_refresh_secs = self.config.scrape.song_refresh_secs,
            "Push ticker started"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(dir: &tempfile::TempDir) -> Config {
        let mut config = Config::default();
        config.storage.playlist_path = dir.path().join("playlist.json");
        config.storage.audit_path = dir.path().join("connections.log");
        config
    }

    #[test]
    fn test_server_creation() {
        let dir = tempfile::tempdir().unwrap();
        let server = Server::new(test_config(&dir));
        assert!(server.is_ok());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&dir);
        config.scrape.push_interval_secs = 0;
        assert!(Server::new(config).is_err());
    }

    #[tokio::test]
    async fn test_state_components_start_empty() {
        let dir = tempfile::tempdir().unwrap();
        let server = Server::new(test_config(&dir)).unwrap();
        let state = server.state();

        assert!(state.store.load_all().await.is_empty());
        assert_eq!(state.registry.stats().await.total, 0);
    }
}
