use crate::headers::presets;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hound_auth::{AuthError, CredentialError};
use http::StatusCode;
use log::error;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// OAuth 2.0 error body (RFC 6749 section 5.2)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OAuthErrorBody {
    /// Error code
    pub error: String,
    /// Human-readable error description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl OAuthErrorBody {
    pub fn new(error: impl Into<String>, description: Option<String>) -> Self {
        Self {
            error: error.into(),
            error_description: description,
        }
    }
}

/// An error leaving an OAuth endpoint
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status_code: StatusCode,
    pub body: OAuthErrorBody,
}

impl ApiError {
    pub fn new(status_code: StatusCode, error: &str, description: Option<String>) -> Self {
        Self {
            status_code,
            body: OAuthErrorBody::new(error, description),
        }
    }

    /// Create new Internal Server Error (500) without leaking the cause
    pub fn server_error() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "server_error", None)
    }

    pub fn invalid_request<S: Into<String>>(description: S) -> Self {
        Self::from(AuthError::invalid_request(description))
    }

    pub fn invalid_client_metadata() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_client_metadata", None)
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        let status_code = match &e {
            AuthError::InvalidClient(_) | AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AuthError::InvalidRequest(_)
            | AuthError::InvalidGrant(_)
            | AuthError::UnsupportedGrantType(_) => StatusCode::BAD_REQUEST,
        };
        Self::new(
            status_code,
            e.error_code(),
            Some(e.description().to_string()),
        )
    }
}

impl From<CredentialError> for ApiError {
    fn from(e: CredentialError) -> Self {
        error!("Credential store failure: {}", e);
        Self::server_error()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status_code, Json(self.body)).into_response();
        presets::no_store().apply(&mut response);
        response
    }
}
