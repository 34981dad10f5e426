//! Append-only connection audit log
//!
//! One text line per connect/disconnect event with timestamp, event kind,
//! topic path, client IP, user agent, origin and referer. Audit failures are
//! logged and swallowed; bookkeeping must never take a connection down.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Local;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::registry::ClientMeta;

/// Audit event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEvent {
    Connect,
    Disconnect,
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Disconnect => write!(f, "disconnect"),
        }
    }
}

/// Writer for the connection audit file
pub struct ConnectionAudit {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ConnectionAudit {
    /// Create an audit writer for the given file path
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Append one audit line; failures are logged, never propagated
    pub async fn record(&self, event: AuditEvent, meta: &ClientMeta) {
        let ts = Local::now().format("%Y-%m-%d %H:%M:%S");
        let line = format!(
            "{ts}  {event:<10}  {path:<12}  {ip}  UA={ua}  ORIGIN={origin}  REF={referer}\n",
            event = event.to_string(),
            path = meta.path,
            ip = meta.ip,
            ua = meta.user_agent,
            origin = meta.origin,
            referer = meta.referer,
        );

        if let Err(e) = self.append(&line).await {
            tracing::warn!(path = %self.path.display(), error = %e, "Audit write failed");
        }
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }

    /// Path of the audit file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
