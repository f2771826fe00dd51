//! HTTP and WebSocket surface
//!
//! Exposes the chat WebSocket endpoint and a health check.

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod websocket;

pub use server::ChatServer;
