//! Chat WebSocket handler
//!
//! Each connection runs two tasks: one drains the relay's outbound queue
//! into the socket, the other decodes client frames and forwards them to the
//! relay. Whichever finishes first tears the connection down.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};

use crate::api::server::AppState;
use crate::error::ChatError;
use crate::models::{ClientEvent, FrameFormat, PROTOCOL_ENVELOPE, PROTOCOL_LEGACY};
use crate::relay::RelayConnection;

/// WebSocket handler for chat clients
pub async fn chat_ws(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Response, ChatError> {
    let allow_legacy = state.config.allow_legacy_protocol;

    if !allow_legacy && only_legacy_requested(&headers) {
        warn!("Rejecting WebSocket upgrade for legacy protocol {}", PROTOCOL_LEGACY);
        return Err(ChatError::UnsupportedProtocol(PROTOCOL_LEGACY.into()));
    }

    let protocols = if allow_legacy {
        vec![PROTOCOL_ENVELOPE, PROTOCOL_LEGACY]
    } else {
        vec![PROTOCOL_ENVELOPE]
    };

    Ok(ws
        .protocols(protocols)
        .on_upgrade(move |socket| handle_chat_ws(socket, state))
        .into_response())
}

/// True when the client asked for the legacy framing and nothing we prefer
fn only_legacy_requested(headers: &HeaderMap) -> bool {
    let requested: Vec<&str> = headers
        .get_all(header::SEC_WEBSOCKET_PROTOCOL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .collect();

    requested.contains(&PROTOCOL_LEGACY) && !requested.contains(&PROTOCOL_ENVELOPE)
}

/// Handle WebSocket connection for a chat client
async fn handle_chat_ws(socket: WebSocket, state: AppState) {
    let format = FrameFormat::from_protocol(socket.protocol().and_then(|p| p.to_str().ok()));
    let allow_legacy = state.config.allow_legacy_protocol;

    let RelayConnection { id, mut events } = match state.relay.connect().await {
        Ok(connection) => connection,
        Err(e) => {
            error!("Failed to register chat connection: {}", e);
            return;
        }
    };

    let (mut sender, mut receiver) = socket.split();

    info!(connection = %id, protocol = %format, "Chat WebSocket connected");

    // Spawn task to write relay events to the WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event.encode(format) {
                Ok(frame) => {
                    if sender.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to encode {} event: {}", event.name(), e);
                }
            }
        }
    });

    // Handle incoming frames
    let relay = state.relay.clone();
    let mut receive_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    let forwarded = match ClientEvent::decode(&text, allow_legacy) {
                        Ok(ClientEvent::SendMessage(message)) => {
                            relay.send_message(id, message).await
                        }
                        Ok(ClientEvent::ClientReady) => relay.ready(id).await,
                        Err(e) => {
                            debug!(connection = %id, "Ignoring frame: {}", e);
                            Ok(())
                        }
                    };
                    if forwarded.is_err() {
                        break;
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!(connection = %id, "Chat WebSocket received close");
                    break;
                }
                Ok(Message::Ping(_)) => {
                    // Pong is handled automatically by axum
                }
                Ok(_) => {
                    debug!(connection = %id, "Ignoring non-text frame");
                }
                Err(e) => {
                    debug!(connection = %id, "Chat WebSocket error: {}", e);
                    break;
                }
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => {}
        _ = &mut receive_task => {}
    }

    send_task.abort();
    receive_task.abort();
    let _ = tokio::join!(send_task, receive_task);

    if let Err(e) = state.relay.disconnect(id).await {
        debug!(connection = %id, "Relay gone before disconnect: {}", e);
    }

    info!(connection = %id, "Chat WebSocket disconnected");
}
