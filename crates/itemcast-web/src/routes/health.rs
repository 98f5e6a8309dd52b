//! Health check.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::state::AppState;

/// Report store reachability and the number of connected WebSocket clients.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.service.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "ws_clients": state.hub.count(),
            })),
        ),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "error": e.to_string(),
                })),
            )
        }
    }
}
