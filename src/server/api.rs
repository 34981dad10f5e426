//! REST API handlers
//!
//! Thin on-demand endpoints over the core: current song and estimate,
//! immediate scrape trigger, the persisted playlist log, connection stats
//! and the raw audit file.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{any, get, post};
use axum::{Json, Router};
use chrono::Local;
use serde::Serialize;

use crate::models::{format_last_update, ListenersPayload, SongPayload};
use crate::tasks::scrape_once;

use super::ws;
use super::AppState;

/// Simple error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Outcome of an on-demand scrape
#[derive(Debug, Serialize)]
pub struct ScrapeResponse {
    pub added: usize,
    pub total: usize,
}

/// Create the router with all REST and WebSocket routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // on-demand endpoints
        .route("/song", get(song_now))
        .route("/listeners", get(listeners_now))
        .route("/playlist.json", get(playlist_file))
        .route("/scrape-now", post(scrape_now))
        // connection introspection
        .route("/ws/stats", get(ws_stats))
        .route("/ws/connections.log", get(connections_log))
        // push subscription endpoints
        .route("/ws/listeners", any(ws::ws_listeners))
        .route("/ws/song", any(ws::ws_song))
        // health
        .route("/healthz", get(health))
        .route("/", get(health))
        .with_state(state)
}

/// Current song snapshot, fetched synchronously
async fn song_now(State(state): State<AppState>) -> impl IntoResponse {
    match state.scraper.fetch_now_playing().await {
        Ok(now_playing) => {
            let payload = SongPayload::from_now_playing(&now_playing, Local::now());
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Now-playing fetch failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse::new("Failed to fetch the current song")),
            )
                .into_response()
        }
    }
}

/// Current listener estimate with an api-scoped seed key
///
/// The seed is derived from the wall-clock second, so repeated requests
/// within one second agree with each other.
async fn listeners_now(State(state): State<AppState>) -> impl IntoResponse {
    let now = Local::now();
    let seed_key = format!("api|listeners|{}", now.format("%Y-%m-%d %H:%M:%S"));
    let listeners = state.estimator.estimate(now, &seed_key, None);

    Json(ListenersPayload {
        last_update: format_last_update(now),
        listeners,
    })
}

/// Persisted playlist log, served verbatim
async fn playlist_file(State(state): State<AppState>) -> impl IntoResponse {
    let content = tokio::fs::read_to_string(state.store.path())
        .await
        .unwrap_or_else(|_| String::from("[]"));

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
        content,
    )
}

/// Trigger an immediate out-of-schedule scrape
async fn scrape_now(State(state): State<AppState>) -> impl IntoResponse {
    match scrape_once(&state.scraper, &state.store).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ScrapeResponse {
                added: outcome.added,
                total: outcome.total,
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse::new(e.to_string())),
        )
            .into_response(),
    }
}

/// Per-topic connection statistics
async fn ws_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.registry.stats().await)
}

/// Raw connection audit log
///
/// A log that has not been written yet reads as "(empty)"; any other read
/// failure is a server error, not an empty log.
async fn connections_log(State(state): State<AppState>) -> impl IntoResponse {
    let path = state.registry_audit_path();
    match tokio::fs::read_to_string(path).await {
        Ok(content) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            content,
        )
            .into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            String::from("(empty)\n"),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Audit log read failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Failed to read the connection log")),
            )
                .into_response()
        }
    }
}

/// Liveness probe
async fn health() -> &'static str {
    "ok"
}
