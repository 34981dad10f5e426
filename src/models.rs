//! Core data structures for radiopulse
//!
//! Playlist entries, the now-playing snapshot, and the JSON payloads pushed
//! over the two WebSocket topics.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Timestamp format used in push payloads ("DD.MM.YYYY HH:MM:SS")
pub const LAST_UPDATE_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Format a timestamp for the `last_update` payload field
#[must_use]
pub fn format_last_update(now: DateTime<Local>) -> String {
    now.format(LAST_UPDATE_FORMAT).to_string()
}

// ============================================================================
// Playlist Item
// ============================================================================

/// One scraped playlist entry
///
/// Immutable once stored. Identity for deduplication purposes is the
/// (date, time, artist, title) tuple; the station label is informational and
/// deliberately excluded from the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistItem {
    /// Calendar date as shown on the page (DD.MM.YYYY)
    pub date: String,

    /// Clock time as shown on the page (HH:MM)
    pub time: String,

    /// Artist name
    pub artist: String,

    /// Track title
    pub title: String,

    /// Station label; stamped with a default at merge time when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station: Option<String>,
}

/// Identity key of a playlist item
pub type ItemKey = (String, String, String, String);

impl PlaylistItem {
    /// Identity key used for deduplication
    #[must_use]
    pub fn identity_key(&self) -> ItemKey {
        (
            self.date.clone(),
            self.time.clone(),
            self.artist.clone(),
            self.title.clone(),
        )
    }

    /// Song key `artist|title|date|time`, used for change detection and as
    /// the deterministic estimator seed
    #[must_use]
    pub fn song_key(&self) -> String {
        format!("{}|{}|{}|{}", self.artist, self.title, self.date, self.time)
    }
}

// ============================================================================
// Now Playing
// ============================================================================

/// Snapshot of the currently playing track, as parsed from the first row of
/// the station page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlaying {
    /// Station name from the page header
    pub station: String,

    /// Track title
    pub title: String,

    /// Artist name
    pub artist: String,

    /// Calendar date (DD.MM.YYYY)
    pub date: String,

    /// Clock time (HH:MM)
    pub time: String,
}

impl NowPlaying {
    /// Song key `artist|title|date|time`
    #[must_use]
    pub fn song_key(&self) -> String {
        format!("{}|{}|{}|{}", self.artist, self.title, self.date, self.time)
    }
}

// ============================================================================
// Push Payloads
// ============================================================================

/// Payload streamed on the `listeners` topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenersPayload {
    /// Timestamp of this update (DD.MM.YYYY HH:MM:SS)
    pub last_update: String,

    /// Estimated listener count
    pub listeners: u32,
}

/// Payload streamed on the `song` topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongPayload {
    pub station: String,
    pub title: String,
    pub artist: String,
    pub date: String,
    pub time: String,
    /// Timestamp of this update (DD.MM.YYYY HH:MM:SS)
    pub last_update: String,
}

impl SongPayload {
    /// Build a payload from a now-playing snapshot
    #[must_use]
    pub fn from_now_playing(now_playing: &NowPlaying, now: DateTime<Local>) -> Self {
        Self {
            station: now_playing.station.clone(),
            title: now_playing.title.clone(),
            artist: now_playing.artist.clone(),
            date: now_playing.date.clone(),
            time: now_playing.time.clone(),
            last_update: format_last_update(now),
        }
    }
}
