use crate::api::mcp::protocol::{JsonRpcError, JsonRpcResponse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use hound_auth::SessionError;
use http::StatusCode;
use log::debug;
use serde_json::{json, Value};
use thiserror::Error;

/// Failures at the session transport boundary
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Missing sessionId parameter")]
    MissingSessionId,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("A notification stream is already attached to session '{0}'")]
    StreamAlreadyAttached(String),

    #[error("Invalid JSON-RPC message: {}", .0.message)]
    InvalidMessage(JsonRpcError),

    #[error("Bad Request: No valid session. POST to initialize first, or use /sse for SSE transport.")]
    NoValidSession,
}

impl TransportError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingSessionId | Self::InvalidMessage(_) | Self::NoValidSession => {
                StatusCode::BAD_REQUEST
            }
            Self::Session(SessionError::NotFound(_) | SessionError::Closed(_)) => {
                StatusCode::NOT_FOUND
            }
            Self::Session(SessionError::KindMismatch { .. }) => StatusCode::BAD_REQUEST,
            Self::StreamAlreadyAttached(_) => StatusCode::CONFLICT,
        }
    }

    /// Machine-readable error code as used on the wire
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingSessionId => "missing_session_id",
            Self::Session(SessionError::NotFound(_) | SessionError::Closed(_)) => {
                "session_not_found"
            }
            Self::Session(SessionError::KindMismatch { .. }) => "kind_mismatch",
            Self::StreamAlreadyAttached(_) => "stream_already_attached",
            Self::InvalidMessage(_) => "invalid_message",
            Self::NoValidSession => "no_valid_session",
        }
    }
}

impl IntoResponse for TransportError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        debug!("Transport request failed with {}: {}", status, self);
        match self {
            Self::InvalidMessage(error) => {
                (status, Json(JsonRpcResponse::failure(Value::Null, error))).into_response()
            }
            other => (
                status,
                Json(json!({
                    "error": other.error_code(),
                    "error_description": other.to_string(),
                })),
            )
                .into_response(),
        }
    }
}
