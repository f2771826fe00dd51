//! Chat server using Axum
//!
//! Serves the chat WebSocket endpoint and the health check.

use std::net::SocketAddr;
use std::time::Instant;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::config::ServerConfig;
use crate::error::{ChatError, Result};
use crate::relay::RelayHandle;

use super::middleware::cors_layer;
use super::routes;

/// Shared state for handlers
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub relay: RelayHandle,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: ServerConfig, relay: RelayHandle) -> Self {
        Self {
            config,
            relay,
            started_at: Instant::now(),
        }
    }
}

/// Chat server
pub struct ChatServer {
    config: ServerConfig,
    state: AppState,
}

impl ChatServer {
    /// Create a new chat server
    pub fn new(config: ServerConfig, relay: RelayHandle) -> Self {
        let state = AppState::new(config.clone(), relay);
        Self { config, state }
    }

    /// Build the router
    pub fn build_router(&self) -> Router {
        routes::create_router(self.state.clone())
            .layer(cors_layer())
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the configured address and run the server
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| ChatError::InvalidConfig(format!("Invalid server address: {}", e)))?;

        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Run the server on an already bound listener
    pub async fn serve(
        &self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        info!(
            "Chat server listening on {} (WebSocket path: {})",
            listener.local_addr()?,
            self.config.ws_path
        );

        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await
            .map_err(|e| ChatError::Internal(e.to_string()))?;

        info!("Chat server shut down");
        Ok(())
    }
}
