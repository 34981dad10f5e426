//! Broadcast registry for push clients
//!
//! Tracks connected push clients per topic and fans payloads out to them.
//! The registry never touches a connection handle: each client is
//! represented by the sending half of an unbounded channel whose receiving
//! half is pumped into the socket by the connection's own handler task. A
//! failed channel send means that task is gone; the client is evicted after
//! the broadcast pass and a disconnect audit event is recorded. Send
//! failures are isolated per client, so one dead subscriber never aborts
//! delivery to the rest.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::models::{ListenersPayload, SongPayload};

use super::audit::{AuditEvent, ConnectionAudit};

// ============================================================================
// Topic
// ============================================================================

/// The two independent broadcast topics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Listener-count updates, pushed every ticker cycle
    Listeners,

    /// Song updates, pushed on change or periodic refresh
    Song,
}

impl Topic {
    /// Topic name used in logs and stats
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listeners => "listeners",
            Self::Song => "song",
        }
    }

    /// WebSocket path clients subscribe on
    #[must_use]
    pub fn ws_path(&self) -> &'static str {
        match self {
            Self::Listeners => "/ws/listeners",
            Self::Song => "/ws/song",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Client Metadata
// ============================================================================

/// Metadata captured when a push client connects
#[derive(Debug, Clone, Serialize)]
pub struct ClientMeta {
    /// Best-effort real client IP (forwarding headers, then peer address)
    pub ip: String,

    /// User agent header
    #[serde(rename = "ua")]
    pub user_agent: String,

    /// Origin header (or sec-websocket-origin)
    pub origin: String,

    /// Referer header
    pub referer: String,

    /// Subscription path
    pub path: String,

    /// Connect time, local clock
    pub connected_at: String,
}

/// One registered push client
struct PushClient {
    meta: ClientMeta,
    sender: mpsc::UnboundedSender<String>,
}

// ============================================================================
// Registry
// ============================================================================

/// Per-topic statistics
#[derive(Debug, Clone, Serialize)]
pub struct TopicStats {
    pub count: usize,
    pub clients: Vec<ClientMeta>,
}

/// Aggregate connection statistics
#[derive(Debug, Clone, Serialize)]
pub struct RegistryStats {
    pub total: usize,
    pub listeners: TopicStats,
    pub song: TopicStats,
}

/// Registry of connected push clients for both topics
pub struct BroadcastRegistry {
    listeners: RwLock<HashMap<Uuid, PushClient>>,
    song: RwLock<HashMap<Uuid, PushClient>>,
    audit: ConnectionAudit,
}

impl BroadcastRegistry {
    /// Create a registry writing audit events to the given file
    #[must_use]
    pub fn new(audit: ConnectionAudit) -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            song: RwLock::new(HashMap::new()),
            audit,
        }
    }

    fn topic_map(&self, topic: Topic) -> &RwLock<HashMap<Uuid, PushClient>> {
        match topic {
            Topic::Listeners => &self.listeners,
            Topic::Song => &self.song,
        }
    }

    /// Register a new client; returns its id and the queue the connection
    /// task must drain into the socket
    pub async fn register(
        &self,
        topic: Topic,
        meta: ClientMeta,
    ) -> (Uuid, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();

        self.audit.record(AuditEvent::Connect, &meta).await;

        let mut map = self.topic_map(topic).write().await;
        map.insert(
            id,
            PushClient {
                meta,
                sender,
            },
        );
        tracing::info!(topic = %topic, clients = map.len(), "Push client connected");

        (id, receiver)
    }

    /// Remove a client; records a disconnect audit event if it was present
    pub async fn unregister(&self, topic: Topic, id: Uuid) {
        let removed = {
            let mut map = self.topic_map(topic).write().await;
            map.remove(&id)
        };
        if let Some(client) = removed {
            self.audit
                .record(AuditEvent::Disconnect, &client.meta)
                .await;
            let count = self.count(topic).await;
            tracing::info!(topic = %topic, clients = count, "Push client disconnected");
        }
    }

    /// Broadcast a listener-count payload
    pub async fn broadcast_listeners(&self, payload: &ListenersPayload) {
        let summary = format!("listeners={}", payload.listeners);
        if let Ok(json) = serde_json::to_string(payload) {
            self.broadcast(Topic::Listeners, &json, &payload.last_update, &summary)
                .await;
        }
    }

    /// Broadcast a song payload
    pub async fn broadcast_song(&self, payload: &SongPayload) {
        let summary = format!(
            "{} - {} [{}]",
            payload.artist, payload.title, payload.time
        );
        if let Ok(json) = serde_json::to_string(payload) {
            self.broadcast(Topic::Song, &json, &payload.last_update, &summary)
                .await;
        }
    }

    /// Fan a serialized payload out to every live client of a topic
    ///
    /// Best effort: each failed send marks that client dead; dead clients
    /// are unregistered after the pass, each producing a disconnect audit
    /// event. Successful deliveries are logged with client metadata.
    async fn broadcast(&self, topic: Topic, json: &str, last_update: &str, summary: &str) {
        let mut dead: Vec<Uuid> = Vec::new();

        {
            let map = self.topic_map(topic).read().await;
            for (id, client) in map.iter() {
                if client.sender.send(json.to_string()).is_err() {
                    dead.push(*id);
                    continue;
                }
                tracing::info!(
                    topic = %topic,
                    ip = %client.meta.ip,
                    origin = %client.meta.origin,
                    referer = %client.meta.referer,
                    ua = %truncate(&client.meta.user_agent, 160),
                    at = %last_update,
                    "DELIVERED {summary}"
                );
            }
        }

        for id in dead {
            self.unregister(topic, id).await;
        }
    }

    /// Number of live clients on a topic
    pub async fn count(&self, topic: Topic) -> usize {
        self.topic_map(topic).read().await.len()
    }

    /// Aggregate per-topic statistics with client metadata
    pub async fn stats(&self) -> RegistryStats {
        let listeners = self.topic_stats(Topic::Listeners).await;
        let song = self.topic_stats(Topic::Song).await;
        RegistryStats {
            total: listeners.count + song.count,
            listeners,
            song,
        }
    }

    async fn topic_stats(&self, topic: Topic) -> TopicStats {
        let map = self.topic_map(topic).read().await;
        TopicStats {
            count: map.len(),
            clients: map.values().map(|c| c.meta.clone()).collect(),
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn registry(dir: &tempfile::TempDir) -> BroadcastRegistry {
        BroadcastRegistry::new(ConnectionAudit::new(dir.path().join("connections.log")))
    }

    fn meta(topic: Topic) -> ClientMeta {
        ClientMeta {
            ip: "198.51.100.4".to_string(),
            user_agent: "test".to_string(),
            origin: String::new(),
            referer: String::new(),
            path: topic.ws_path().to_string(),
            connected_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    fn listeners_payload(n: u32) -> ListenersPayload {
        ListenersPayload {
            last_update: "20.01.2025 10:00:00".to_string(),
            listeners: n,
        }
    }

    #[tokio::test]
    async fn test_register_and_unregister() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(&dir);

        let (id, _rx) = registry.register(Topic::Listeners, meta(Topic::Listeners)).await;
        assert_eq!(registry.count(Topic::Listeners).await, 1);
        assert_eq!(registry.count(Topic::Song).await, 0);

        registry.unregister(Topic::Listeners, id).await;
        assert_eq!(registry.count(Topic::Listeners).await, 0);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_live_client() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(&dir);

        let (_id, mut rx) = registry.register(Topic::Listeners, meta(Topic::Listeners)).await;
        registry.broadcast_listeners(&listeners_payload(1234)).await;

        let delivered = rx.recv().await.unwrap();
        assert!(delivered.contains("\"listeners\":1234"));
    }

    #[tokio::test]
    async fn test_dead_client_is_evicted_with_audit() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(&dir);

        let (_id, rx) = registry.register(Topic::Listeners, meta(Topic::Listeners)).await;
        drop(rx); // connection task gone: every send now fails

        registry.broadcast_listeners(&listeners_payload(1)).await;
        assert_eq!(registry.count(Topic::Listeners).await, 0);

        let audit = tokio::fs::read_to_string(dir.path().join("connections.log"))
            .await
            .unwrap();
        assert!(audit.contains("connect"));
        assert!(audit.contains("disconnect"));
    }

    #[tokio::test]
    async fn test_eviction_does_not_disturb_other_clients() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(&dir);

        let (_dead_id, dead_rx) = registry.register(Topic::Listeners, meta(Topic::Listeners)).await;
        let (_live_id, mut live_rx) =
            registry.register(Topic::Listeners, meta(Topic::Listeners)).await;
        drop(dead_rx);

        registry.broadcast_listeners(&listeners_payload(42)).await;

        assert_eq!(registry.count(Topic::Listeners).await, 1);
        assert!(live_rx.recv().await.unwrap().contains("42"));
    }

    #[tokio::test]
    async fn test_topics_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(&dir);

        let (_id, mut song_rx) = registry.register(Topic::Song, meta(Topic::Song)).await;
        registry.broadcast_listeners(&listeners_payload(7)).await;

        // nothing on the song topic
        assert!(song_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stats() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(&dir);

        let (_a, _rx_a) = registry.register(Topic::Listeners, meta(Topic::Listeners)).await;
        let (_b, _rx_b) = registry.register(Topic::Song, meta(Topic::Song)).await;

        let stats = registry.stats().await;
        assert_eq!(stats.total, 2);
        assert_eq!(stats.listeners.count, 1);
        assert_eq!(stats.song.count, 1);
        assert_eq!(stats.song.clients[0].path, "/ws/song");
    }
}
