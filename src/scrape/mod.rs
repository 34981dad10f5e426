//! Fetching and parsing of the station playlist page
//!
//! [`PlaylistScraper`] combines the HTTP fetcher and the HTML parser behind
//! the two operations the rest of the system needs: the full page of recent
//! tracks for the playlist store, and the single now-playing row for the
//! push ticker. Both are fallible and potentially slow; callers treat every
//! failure as transient and skip the cycle.

pub mod fetcher;
pub mod parser;

use chrono::Local;

use crate::config::ScrapeConfig;
use crate::error::Result;
use crate::models::{NowPlaying, PlaylistItem};

pub use fetcher::PageFetcher;
pub use parser::PlaylistParser;

/// Fetch-and-parse facade over the station playlist page
pub struct PlaylistScraper {
    fetcher: PageFetcher,
    parser: PlaylistParser,
    default_station: String,
}

impl PlaylistScraper {
    /// Create a scraper from scrape configuration
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        Ok(Self {
            fetcher: PageFetcher::new(config)?,
            parser: PlaylistParser::new(),
            default_station: config.station.clone(),
        })
    }

    /// Create a scraper around an existing fetcher, used by tests
    #[must_use]
    pub fn with_fetcher(fetcher: PageFetcher, default_station: &str) -> Self {
        Self {
            fetcher,
            parser: PlaylistParser::new(),
            default_station: default_station.to_string(),
        }
    }

    /// Scrape the full page of recent tracks, newest first
    pub async fn scrape_page(&self) -> Result<Vec<PlaylistItem>> {
        let html = self.fetcher.fetch_page().await?;
        let today = Local::now().date_naive();
        Ok(self.parser.parse_rows(&html, today)?)
    }

    /// Fetch the currently playing row plus the station name
    pub async fn fetch_now_playing(&self) -> Result<NowPlaying> {
        let html = self.fetcher.fetch_page().await?;
        let today = Local::now().date_naive();
        Ok(self
            .parser
            .parse_now_playing(&html, today, &self.default_station)?)
    }
}
