//! # Lookback-rs
//!
//! A small web server for browsing and searching archived Claude session
//! logs.
//!
//! The server reads JSONL session files from ~/.claude/projects/ on every
//! request; there is no index and no cache, so whatever is on disk is what
//! you see. The log store is strictly read-only from here.
//!
//! ## API Endpoints
//!
//! - `GET /health` - Server health check
//! - `GET /api/sessions` - List all sessions, newest first
//! - `GET /api/sessions/{session_id}` - Full message history for a session
//! - `GET /api/search?q=...` - Full-text search across all sessions

mod records;
mod render;
mod sessions;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Instant};
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::sessions::{SearchHit, SessionDetail, SessionStore, SessionSummary};

/// Global application state shared across all HTTP handlers.
struct AppState {
    start_time: Instant,     // Server start time for uptime tracking
    store: SessionStore,     // Read-only view over ~/.claude/projects/
}

/// Error body for the structured failure cases (unknown session id,
/// missing search query). Everything else degrades to partial results.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

// ============================================================================
// Health Endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    version: &'static str,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.start_time.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Session Endpoints
// ============================================================================

async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<Vec<SessionSummary>> {
    Json(state.store.scan_sessions())
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionDetail>, (StatusCode, Json<ErrorResponse>)> {
    match state.store.read_session(&session_id) {
        Some(detail) => Ok(Json(detail)),
        None => Err(error_response(StatusCode::NOT_FOUND, "Session not found")),
    }
}

// ============================================================================
// Search Endpoint
// ============================================================================

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
}

async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchHit>>, (StatusCode, Json<ErrorResponse>)> {
    let query = match params.q.as_deref() {
        Some(q) if !q.is_empty() => q,
        _ => {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                "Query parameter required",
            ))
        }
    };

    Ok(Json(state.store.search(query)))
}

// ============================================================================
// Server Setup
// ============================================================================

/// Log root: $CLAUDE_DIR if set, otherwise ~/.claude/projects.
fn resolve_log_root() -> PathBuf {
    if let Ok(dir) = std::env::var("CLAUDE_DIR") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/home/user".to_string());
    PathBuf::from(home).join(".claude").join("projects")
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/{session_id}", get(get_session))
        .route("/api/search", get(search))
        // Static frontend
        .fallback_service(ServeDir::new("public").append_index_html_on_directories(true))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lookback_rs=info".parse().unwrap())
                .add_directive("tower_http=info".parse().unwrap()),
        )
        .init();

    let log_root = resolve_log_root();
    tracing::info!("Scanning Claude logs from: {}", log_root.display());

    let state = Arc::new(AppState {
        start_time: Instant::now(),
        store: SessionStore::new(log_root),
    });

    let app = build_router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3003);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Lookback-rs v{} listening on {}", env!("CARGO_PKG_VERSION"), addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
