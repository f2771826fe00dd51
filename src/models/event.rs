//! Application events and their JSON framings
//!
//! Each event travels as one WebSocket text frame. Two framings exist:
//!
//! - envelope (`chat.v2`): `{"event": "send_message", "data": {...}}`
//! - legacy (`chat.v1`): `["send_message", {...}]`

use serde_json::{json, Value};

use super::ChatMessage;
use crate::error::{ChatError, Result};

/// Sub-protocol name for the envelope framing
pub const PROTOCOL_ENVELOPE: &str = "chat.v2";
/// Sub-protocol name for the legacy array framing
pub const PROTOCOL_LEGACY: &str = "chat.v1";

pub const EVENT_SEND_MESSAGE: &str = "send_message";
pub const EVENT_CLIENT_READY: &str = "client_ready";
pub const EVENT_RECEIVE_MESSAGE: &str = "receive_message";
pub const EVENT_CHAT_HISTORY: &str = "chat_history";

/// Frame layout used on a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameFormat {
    #[default]
    Envelope,
    Legacy,
}

impl FrameFormat {
    pub fn as_protocol(&self) -> &'static str {
        match self {
            FrameFormat::Envelope => PROTOCOL_ENVELOPE,
            FrameFormat::Legacy => PROTOCOL_LEGACY,
        }
    }

    /// Map a negotiated sub-protocol to a frame format
    ///
    /// No protocol, or one we don't know, falls back to the envelope.
    pub fn from_protocol(protocol: Option<&str>) -> Self {
        match protocol {
            Some(PROTOCOL_LEGACY) => FrameFormat::Legacy,
            _ => FrameFormat::Envelope,
        }
    }
}

impl std::fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_protocol())
    }
}

/// Events a client may send
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Append to history and broadcast to everyone
    SendMessage(ChatMessage),
    /// Listeners are attached; history may be delivered now
    ClientReady,
}

impl ClientEvent {
    /// Decode a text frame
    ///
    /// Envelope frames are always understood. Legacy array frames are only
    /// accepted when `allow_legacy` is set.
    pub fn decode(text: &str, allow_legacy: bool) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| ChatError::InvalidFrame(e.to_string()))?;

        let (name, data) = match value {
            Value::Object(mut map) => {
                let name = match map.remove("event") {
                    Some(Value::String(name)) => name,
                    _ => {
                        return Err(ChatError::InvalidFrame(
                            "missing string field `event`".into(),
                        ))
                    }
                };
                (name, map.remove("data").unwrap_or(Value::Null))
            }
            Value::Array(items) if allow_legacy => {
                let mut items = items.into_iter();
                let name = match items.next() {
                    Some(Value::String(name)) => name,
                    _ => {
                        return Err(ChatError::InvalidFrame(
                            "legacy frame must start with an event name".into(),
                        ))
                    }
                };
                (name, items.next().unwrap_or(Value::Null))
            }
            Value::Array(_) => {
                return Err(ChatError::UnsupportedProtocol(PROTOCOL_LEGACY.into()));
            }
            _ => {
                return Err(ChatError::InvalidFrame(
                    "expected an object or an array".into(),
                ))
            }
        };

        match name.as_str() {
            EVENT_SEND_MESSAGE => Ok(ClientEvent::SendMessage(ChatMessage::from(data))),
            EVENT_CLIENT_READY => Ok(ClientEvent::ClientReady),
            _ => Err(ChatError::UnknownEvent(name)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::SendMessage(_) => EVENT_SEND_MESSAGE,
            ClientEvent::ClientReady => EVENT_CLIENT_READY,
        }
    }
}

/// Events the server emits
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// A message broadcast to every connected client
    ReceiveMessage(ChatMessage),
    /// One-time replay of recent messages for a new client
    ChatHistory(Vec<ChatMessage>),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::ReceiveMessage(_) => EVENT_RECEIVE_MESSAGE,
            ServerEvent::ChatHistory(_) => EVENT_CHAT_HISTORY,
        }
    }

    /// Encode as a text frame in the given format
    pub fn encode(&self, format: FrameFormat) -> Result<String> {
        let data = match self {
            ServerEvent::ReceiveMessage(message) => serde_json::to_value(message)?,
            ServerEvent::ChatHistory(messages) => serde_json::to_value(messages)?,
        };

        let frame = match format {
            FrameFormat::Envelope => json!({ "event": self.name(), "data": data }),
            FrameFormat::Legacy => json!([self.name(), data]),
        };

        Ok(serde_json::to_string(&frame)?)
    }
}
