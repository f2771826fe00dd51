//! Chat Relay - real-time WebSocket chat
//!
//! Clients connect over WebSocket, send messages, and receive every message
//! sent by anyone (themselves included). Newly connected clients get a
//! one-time replay of the most recent messages.
//!
//! ## Features
//!
//! - Self-inclusive broadcast of every message to all connected clients
//! - Bounded in-memory history replayed once per connection
//! - Explicit `client_ready` handshake with a timed fallback
//! - Envelope (`chat.v2`) and legacy array (`chat.v1`) frame formats
//! - Permissive CORS and a health endpoint

pub mod api;
pub mod config;
pub mod error;
pub mod history;
pub mod models;
pub mod relay;

pub use config::Config;
pub use error::{ChatError, Result};
pub use history::HistoryBuffer;
pub use relay::{ChatRelay, RelayHandle};
