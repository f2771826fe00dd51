//! API route definitions

use axum::routing::get;
use axum::Router;

use super::handlers;
use super::server::AppState;
use super::websocket;

/// Path of the health check endpoint
pub const HEALTH_PATH: &str = "/health";

/// Create the router with the health check and the chat WebSocket endpoint
pub fn create_router(state: AppState) -> Router {
    let ws_path = state.config.ws_path.clone();

    Router::new()
        .route(HEALTH_PATH, get(handlers::health::health_check))
        .route(&ws_path, get(websocket::chat::chat_ws))
        .with_state(state)
}
