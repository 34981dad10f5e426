//! radiopulse - Radio now-playing scraper and push service
//!
//! Scrapes a radio station's public playlist page on a schedule, keeps a
//! deduplicated playlist log on disk, and pushes now-playing updates plus a
//! synthetic listener-count estimate to WebSocket subscribers.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`scrape`] - Playlist page fetching and HTML parsing
//! - [`store`] - Deduplicating playlist log persistence
//! - [`estimator`] - Deterministic listener-count synthesis
//! - [`server`] - REST and WebSocket endpoints, broadcast registry
//! - [`tasks`] - Scrape scheduler and push ticker loops
//! - [`models`] - Core data structures and payloads
//!
//! # Example
//!
//! ```no_run
//! use radiopulse::config::Config;
//! use radiopulse::server::Server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let server = Server::new(config)?;
//!     server
//!         .start_with_shutdown(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod estimator;
pub mod models;
pub mod scrape;
pub mod server;
pub mod store;
pub mod tasks;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::estimator::ListenerEstimator;
    pub use crate::models::{ListenersPayload, NowPlaying, PlaylistItem, SongPayload};
    pub use crate::scrape::PlaylistScraper;
    pub use crate::server::Server;
    pub use crate::store::PlaylistStore;
}

// Direct re-exports for convenience
pub use models::{ListenersPayload, NowPlaying, PlaylistItem, SongPayload};
