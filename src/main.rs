//! Chat Relay - Entry Point
//!
//! Starts the relay task and the WebSocket server with graceful shutdown support.

use tokio::signal;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chat_relay::api::ChatServer;
use chat_relay::config::LogConfig;
use chat_relay::{ChatError, ChatRelay, Config, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    init_tracing(&config.log);
    info!("Starting Chat Relay");

    // Create shutdown channel
    let (shutdown_tx, _) = watch::channel(false);

    // Start relay
    let (relay, relay_handle) = ChatRelay::new(&config.relay);
    let relay_task = tokio::spawn(relay.run(shutdown_tx.subscribe()));

    // Start server
    let server = ChatServer::new(config.server.clone(), relay_handle);
    let server_shutdown = shutdown_tx.subscribe();
    let mut server_task = tokio::spawn(async move { server.run(server_shutdown).await });

    info!("Server starting on {}", config.server_addr());

    // Run until a shutdown signal arrives or the server fails on its own
    let result = tokio::select! {
        result = &mut server_task => result,
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
            (&mut server_task).await
        }
    };

    let _ = shutdown_tx.send(true);
    let _ = relay_task.await;

    result.map_err(|e| ChatError::Internal(e.to_string()))??;

    info!("Chat Relay stopped");
    Ok(())
}

/// Initialize tracing from the log configuration
///
/// `RUST_LOG` takes precedence over `LOG_LEVEL`.
fn init_tracing(log: &LogConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("chat_relay={},tower_http=debug", log.level).into());

    let registry = tracing_subscriber::registry().with(filter);

    if log.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
