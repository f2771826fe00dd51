//! WebSocket handlers

pub mod chat;
