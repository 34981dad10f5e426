//! HTTP fetcher for the station playlist page
//!
//! A thin reqwest wrapper with a configured timeout, gzip and a browser-like
//! User-Agent. The page is fetched whole; parsing lives in
//! [`crate::scrape::parser`]. A base-URL override is provided for tests
//! against mock servers.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use std::time::Duration;

use crate::config::ScrapeConfig;
use crate::error::FetchError;

/// Fetcher for the station playlist page
pub struct PageFetcher {
    client: Client,
    url: String,
    user_agent: String,
}

impl PageFetcher {
    /// Create a fetcher from scrape configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(config: &ScrapeConfig) -> Result<Self, FetchError> {
        Self::with_url(
            &config.playlist_url,
            &config.user_agent,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Create a fetcher for an explicit URL, used by tests with mock servers
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn with_url(
        url: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            url: url.to_string(),
            user_agent: user_agent.to_string(),
        })
    }

    /// Fetch the playlist page body
    ///
    /// # Errors
    ///
    /// * `FetchError::Timeout` when the request times out
    /// * `FetchError::ServerError` on a non-success status
    /// * `FetchError::Http` on any other transport failure
    pub async fn fetch_page(&self) -> Result<String, FetchError> {
        let mut headers = HeaderMap::new();
        if let Ok(ua) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, ua);
        }
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("sk,en;q=0.9"));

        let response = self
            .client
            .get(&self.url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::ServerError(status.as_u16()));
        }

        Ok(response.text().await?)
    }

    /// URL this fetcher targets
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_creation() {
        let config = ScrapeConfig::default();
        let fetcher = PageFetcher::new(&config);
        assert!(fetcher.is_ok());
        assert_eq!(fetcher.unwrap().url(), config.playlist_url);
    }

    #[test]
    fn test_fetcher_with_custom_url() {
        let fetcher =
            PageFetcher::with_url("http://127.0.0.1:1/playlist", "test", Duration::from_secs(1))
                .unwrap();
        assert_eq!(fetcher.url(), "http://127.0.0.1:1/playlist");
    }
}
