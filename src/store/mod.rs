//! Dedup-merge playlist store
//!
//! Owns the persisted playlist log: an ordered JSON array of
//! [`PlaylistItem`], newest first. Each merge loads the current log, filters
//! the incoming batch down to items whose (date, time, artist, title)
//! identity key is not present yet, prepends them, applies the optional
//! length cap and writes the file back. A merge that adds nothing performs
//! no write, so re-merging the same batch is idempotent.
//!
//! Reads and writes happen under one async mutex: the read-modify-write is a
//! single critical section even if an out-of-schedule scrape overlaps the
//! scheduled one.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::{ItemKey, PlaylistItem};

/// Result of one merge pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Items actually appended by this merge
    pub added: usize,

    /// Log length after the merge
    pub total: usize,
}

/// Persistent deduplicating playlist store
pub struct PlaylistStore {
    path: PathBuf,
    limit: usize,
    default_station: String,
    lock: Mutex<()>,
}

impl PlaylistStore {
    /// Create a store over a playlist log file
    ///
    /// `limit` caps the log length (0 = uncapped); `default_station` is
    /// stamped onto merged items that do not carry a station label.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, limit: usize, default_station: &str) -> Self {
        Self {
            path: path.into(),
            limit,
            default_station: default_station.to_string(),
            lock: Mutex::new(()),
        }
    }

    /// Load the full log, newest first
    ///
    /// A missing or corrupt file degrades to an empty log; corruption is
    /// logged but never fatal.
    pub async fn load_all(&self) -> Vec<PlaylistItem> {
        read_log(&self.path).await
    }

    /// Merge newly scraped items into the log
    ///
    /// Input order is preserved for the surviving items, which are prepended
    /// (the batch is expected newest first, like the page). Returns the
    /// number added and the new total.
    ///
    /// # Errors
    ///
    /// Only a failed write errors out; that failure is fatal to this merge
    /// call alone and leaves the previous log intact on disk.
    pub async fn merge(&self, new_items: Vec<PlaylistItem>) -> Result<MergeOutcome> {
        let _guard = self.lock.lock().await;

        let existing = read_log(&self.path).await;
        let mut seen: HashSet<ItemKey> = existing.iter().map(PlaylistItem::identity_key).collect();

        let mut to_add: Vec<PlaylistItem> = Vec::new();
        for mut item in new_items {
            item.station
                .get_or_insert_with(|| self.default_station.clone());
            if seen.insert(item.identity_key()) {
                to_add.push(item);
            }
        }

        if to_add.is_empty() {
            return Ok(MergeOutcome {
                added: 0,
                total: existing.len(),
            });
        }

        let added = to_add.len();
        let mut merged = to_add;
        merged.extend(existing);
        if self.limit > 0 {
            merged.truncate(self.limit);
        }

        write_log(&self.path, &merged).await?;

        Ok(MergeOutcome {
            added,
            total: merged.len(),
        })
    }

    /// Path of the underlying log file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn read_log(path: &Path) -> Vec<PlaylistItem> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Playlist log corrupt, treating as empty");
                Vec::new()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Playlist log unreadable, treating as empty");
            Vec::new()
        }
    }
}

async fn write_log(path: &Path, items: &[PlaylistItem]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let json = serde_json::to_string_pretty(items)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}
