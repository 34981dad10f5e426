//! Unified error handling for the radiopulse crate
//!
//! This module provides a single `Error` enum that consolidates the
//! domain-specific errors (fetch, parse, store) so that callers on module
//! boundaries only have to deal with one type.
//!
//! The scheduler and ticker loops use [`Error::is_transient`] to decide
//! whether a failure merely skips the current cycle or is worth a louder
//! log line; no error from either loop ever terminates the loop itself.

use std::io;
use thiserror::Error;

/// Errors that can occur while fetching the station playlist page
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server responded with a non-success status
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,
}

/// Errors that can occur while parsing the playlist page
#[derive(Error, Debug)]
pub enum ParseError {
    /// No playlist rows found in the document
    #[error("No playlist rows found")]
    NoRows,

    /// A row was missing one of its mandatory columns
    #[error("Row is missing the {0} column")]
    MissingColumn(&'static str),

    /// Clock time column did not look like HH:MM
    #[error("Invalid time value: {0}")]
    InvalidTime(String),
}

/// Unified error type for the radiopulse crate
#[derive(Error, Debug)]
pub enum Error {
    /// Fetch-specific errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Parse-specific errors
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// I/O errors (playlist log, audit log)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Check whether this error is transient (skip the cycle, try again on
    /// the next scheduled firing) as opposed to a local, non-retryable one.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Fetch(_) | Self::Parse(_) => true,
            Self::Io(_) => true,
            Self::Json(_) => false,
            Self::Config(_) => false,
            Self::Other(_) => false,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Fetch(FetchError::Http(err))
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_is_transient() {
        let err = Error::Fetch(FetchError::Timeout);
        assert!(err.is_transient());
    }

    #[test]
    fn test_parse_error_is_transient() {
        let err = Error::Parse(ParseError::NoRows);
        assert!(err.is_transient());
    }

    #[test]
    fn test_config_error_is_fatal() {
        let err = Error::config("bad scrape interval");
        assert!(!err.is_transient());
        assert!(err.to_string().contains("bad scrape interval"));
    }

    #[test]
    fn test_parse_error_conversion() {
        let err: Error = ParseError::MissingColumn("artist").into();
        assert!(matches!(err, Error::Parse(_)));
        assert!(err.to_string().contains("artist"));
    }
}
