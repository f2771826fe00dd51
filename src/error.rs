use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unified error type for the chat relay
#[derive(Error, Debug)]
pub enum ChatError {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Transport errors
    #[error("Unsupported WebSocket sub-protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    // Relay errors
    #[error("Relay is not running")]
    RelayUnavailable,

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for chat relay operations
pub type Result<T> = std::result::Result<T, ChatError>;

impl ChatError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            ChatError::UnsupportedProtocol(_)
            | ChatError::InvalidFrame(_)
            | ChatError::UnknownEvent(_) => StatusCode::BAD_REQUEST,

            // 503 Service Unavailable
            ChatError::RelayUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            ChatError::InvalidConfig(_)
            | ChatError::Serialization(_)
            | ChatError::Io(_)
            | ChatError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}
