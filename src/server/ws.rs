//! WebSocket subscription endpoints
//!
//! One persistent connection per client on `/ws/listeners` or `/ws/song`.
//! The handler task is the sole owner of the socket: it registers the
//! client with the broadcast registry, then pumps the registry queue into
//! the socket until either side goes away. Ticker and scheduler tasks only
//! ever enqueue; they never see a socket.
//!
//! On connecting to the song endpoint the current snapshot is sent before
//! any ticker-driven update, best effort.

use std::net::SocketAddr;
use std::sync::OnceLock;

use axum::extract::connect_info::ConnectInfo;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use chrono::Local;
use regex::Regex;

use crate::models::SongPayload;

use super::registry::{ClientMeta, Topic};
use super::AppState;

/// Upgrade handler for `/ws/listeners`
pub async fn ws_listeners(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Response {
    let meta = client_meta(&headers, peer, Topic::Listeners.ws_path());
    ws.on_upgrade(move |socket| handle_socket(state, socket, Topic::Listeners, meta))
}

/// Upgrade handler for `/ws/song`
pub async fn ws_song(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Response {
    let meta = client_meta(&headers, peer, Topic::Song.ws_path());
    ws.on_upgrade(move |socket| handle_socket(state, socket, Topic::Song, meta))
}

/// Drive one accepted connection until it closes or a send fails
async fn handle_socket(state: AppState, mut socket: WebSocket, topic: Topic, meta: ClientMeta) {
    let (id, mut queue) = state.registry.register(topic, meta).await;
    let mut shutdown = state.shutdown.clone();

    // song subscribers get the current snapshot right away
    if topic == Topic::Song {
        if let Ok(now_playing) = state.scraper.fetch_now_playing().await {
            let payload = SongPayload::from_now_playing(&now_playing, Local::now());
            if let Ok(json) = serde_json::to_string(&payload) {
                let _ = socket.send(Message::Text(json.into())).await;
            }
        }
    }

    loop {
        tokio::select! {
            queued = queue.recv() => {
                match queued {
                    Some(json) => {
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    // registry side closed the queue
                    None => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    // clients are not expected to talk; ignore their frames
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    }

    state.registry.unregister(topic, id).await;
}

/// Build client metadata from request headers and the peer address
#[must_use]
pub fn client_meta(headers: &HeaderMap, peer: SocketAddr, path: &str) -> ClientMeta {
    let header = |name: &str| -> String {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };

    let origin = {
        let o = header("origin");
        if o.is_empty() {
            header("sec-websocket-origin")
        } else {
            o
        }
    };

    ClientMeta {
        ip: real_ip(headers, peer),
        user_agent: header("user-agent"),
        origin,
        referer: header("referer"),
        path: path.to_string(),
        connected_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

/// Resolve the best-effort real client IP
///
/// Precedence: fly-client-ip > cf-connecting-ip > x-real-ip > first entry of
/// x-forwarded-for > the `for=` token of a Forwarded header > peer address.
#[must_use]
pub fn real_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    for name in ["fly-client-ip", "cf-connecting-ip", "x-real-ip"] {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }

    if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = xff.split(',').map(str::trim).find(|p| !p.is_empty()) {
            return first.to_string();
        }
    }

    if let Some(fwd) = headers.get("forwarded").and_then(|v| v.to_str().ok()) {
        static FOR_TOKEN: OnceLock<Regex> = OnceLock::new();
        let re = FOR_TOKEN
            .get_or_init(|| Regex::new(r#"for="?(\[?[A-Za-z0-9\.:]+\]?)"?"#).expect("valid regex"));
        if let Some(caps) = re.captures(fwd) {
            let ip = caps[1].trim_matches('"').trim_matches(['[', ']']);
            if !ip.is_empty() {
                return ip.to_string();
            }
        }
    }

    peer.ip().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> SocketAddr {
        "192.0.2.10:52000".parse().unwrap()
    }

    #[test]
    fn test_real_ip_falls_back_to_peer() {
        let headers = HeaderMap::new();
        assert_eq!(real_ip(&headers, peer()), "192.0.2.10");
    }

    #[test]
    fn test_real_ip_prefers_platform_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9"));
        headers.insert("fly-client-ip", HeaderValue::from_static("198.51.100.1"));
        assert_eq!(real_ip(&headers, peer()), "198.51.100.1");
    }

    #[test]
    fn test_real_ip_first_forwarded_for_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(real_ip(&headers, peer()), "203.0.113.9");
    }

    #[test]
    fn test_real_ip_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "forwarded",
            HeaderValue::from_static(r#"for="203.0.113.43";proto=https"#),
        );
        assert_eq!(real_ip(&headers, peer()), "203.0.113.43");
    }

    #[test]
    fn test_client_meta_origin_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "sec-websocket-origin",
            HeaderValue::from_static("https://legacy.test"),
        );
        headers.insert("user-agent", HeaderValue::from_static("agent/1.0"));

        let meta = client_meta(&headers, peer(), "/ws/song");
        assert_eq!(meta.origin, "https://legacy.test");
        assert_eq!(meta.user_agent, "agent/1.0");
        assert_eq!(meta.path, "/ws/song");
    }
}
