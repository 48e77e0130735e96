use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

/// Structured health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Open WebSocket connections, including ones still in the handshake.
    pub connections: usize,
    pub players: PlayerInfo,
}

#[derive(Serialize)]
pub struct PlayerInfo {
    pub count: usize,
    pub names: Vec<String>,
}

/// Returns server status, connection count and joined players as JSON.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.connection_count.load(Ordering::Relaxed);

    let players = {
        let registry = state.registry.read().await;
        PlayerInfo {
            count: registry.count(),
            names: registry.names(),
        }
    };

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        connections,
        players,
    })
}
