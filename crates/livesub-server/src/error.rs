//! Server error types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors reported to HTTP and WebSocket clients.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("session is closed: {0}")]
    SessionClosed(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ServerError::SessionClosed(_) => "SESSION_CLOSED",
            ServerError::ResourceNotFound(_) => "RESOURCE_NOT_FOUND",
            ServerError::MethodNotFound(_) => "METHOD_NOT_FOUND",
            ServerError::InvalidRequest(_) => "INVALID_REQUEST",
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::Io(_) => "IO_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::SessionClosed(_) => StatusCode::GONE,
            ServerError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::MethodNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) | ServerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<livesub_core::Error> for ServerError {
    fn from(err: livesub_core::Error) -> Self {
        match err {
            livesub_core::Error::SessionClosed(id) => ServerError::SessionClosed(id.to_string()),
            livesub_core::Error::ResourceNotFound(id) => {
                ServerError::ResourceNotFound(id.to_string())
            }
            err @ livesub_core::Error::DeliveryFailed { .. } => {
                ServerError::Internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));

        (self.status(), body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
