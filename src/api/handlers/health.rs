//! Health check endpoint

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::api::server::AppState;
use crate::error::ChatError;

/// Health check endpoint
///
/// Reports live relay counters; answers 503 once the relay has stopped.
pub async fn health_check(State(state): State<AppState>) -> Result<impl IntoResponse, ChatError> {
    let stats = state.relay.stats().await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "status": "running",
            "service": "chat-relay",
            "connections": stats.connections,
            "history": stats.history,
            "uptime_secs": state.started_at.elapsed().as_secs(),
        })),
    ))
}
