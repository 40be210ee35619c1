//! HTTP route definitions

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::app::AppState;
use crate::game::{ArenaConfig, RoomSummary};
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS: explicit origins when CLIENT_ORIGIN is set, anything otherwise
    let cors = if state.config.client_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let allowed_origins: Vec<HeaderValue> = state
            .config
            .client_origins
            .iter()
            .filter_map(|s| s.parse::<HeaderValue>().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(allowed_origins)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    };

    Router::new()
        .route("/health", get(health_handler))
        .route("/rooms", get(rooms_handler))
        .route("/rooms/:code", get(room_handler))
        .route("/arena", get(arena_handler))
        .route("/ws", get(ws_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_rooms: usize,
    active_players: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_rooms: state.rooms.active_rooms(),
        active_players: state.rooms.total_players(),
    })
}

// ============================================================================
// Room listing
// ============================================================================

async fn rooms_handler(State(state): State<AppState>) -> Json<Vec<RoomSummary>> {
    Json(state.rooms.summaries())
}

async fn room_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<RoomSummary>, AppError> {
    state
        .rooms
        .get(&code)
        .map(|room| Json(room.summary()))
        .ok_or_else(|| AppError::NotFound(format!("room {code}")))
}

// ============================================================================
// Arena layout
// ============================================================================

/// Clients build their collision index from this
async fn arena_handler(State(state): State<AppState>) -> Json<ArenaConfig> {
    Json(state.rooms.arena().as_ref().clone())
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::game::RoomSettings;
    use tokio::sync::mpsc;
    use tokio_test::assert_ok;
    use uuid::Uuid;

    fn state() -> AppState {
        let config = Config {
            server_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "debug".to_string(),
            client_origins: Vec::new(),
            arena_path: None,
            room: RoomSettings::default(),
            input_rate_limit: 60,
        };
        AppState::new(config).unwrap()
    }

    #[tokio::test]
    async fn health_counts_rooms() {
        let state = state();
        let Json(health) = health_handler(State(state.clone())).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.active_rooms, 0);

        let (tx, _rx) = mpsc::channel(16);
        assert_ok!(state.rooms.join("5555", Uuid::new_v4(), "Alice", tx).await);
        let Json(health) = health_handler(State(state)).await;
        assert_eq!(health.active_rooms, 1);
    }

    #[tokio::test]
    async fn unknown_room_is_404() {
        let err = room_handler(State(state()), Path("nope".to_string()))
            .await
            .err()
            .unwrap();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn arena_is_served_as_loaded() {
        let Json(arena) = arena_handler(State(state())).await;
        assert_eq!(arena, ArenaConfig::default());
    }
}
