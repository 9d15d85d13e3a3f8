use crate::session::TransportKind;
use thiserror::Error;

/// Errors returned by the grant handlers and the bearer validator.
///
/// Every variant maps onto an RFC 6749 error code and carries a description
/// that is safe to return to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid_request: {0}")]
    InvalidRequest(String),

    #[error("invalid_client: {0}")]
    InvalidClient(String),

    #[error("invalid_grant: {0}")]
    InvalidGrant(String),

    #[error("unsupported_grant_type: {0}")]
    UnsupportedGrantType(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

impl AuthError {
    pub fn invalid_request<S: Into<String>>(description: S) -> Self {
        Self::InvalidRequest(description.into())
    }

    pub fn invalid_client<S: Into<String>>(description: S) -> Self {
        Self::InvalidClient(description.into())
    }

    pub fn invalid_grant<S: Into<String>>(description: S) -> Self {
        Self::InvalidGrant(description.into())
    }

    pub fn unauthorized<S: Into<String>>(description: S) -> Self {
        Self::Unauthorized(description.into())
    }

    /// Machine-readable error code as used on the wire
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidClient(_) => "invalid_client",
            Self::InvalidGrant(_) => "invalid_grant",
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            Self::Unauthorized(_) => "unauthorized",
        }
    }

    /// Human-readable description
    pub fn description(&self) -> &str {
        match self {
            Self::InvalidRequest(d)
            | Self::InvalidClient(d)
            | Self::InvalidGrant(d)
            | Self::UnsupportedGrantType(d)
            | Self::Unauthorized(d) => d,
        }
    }
}

/// Errors raised while reading or writing the credential file
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("I/O error on credential file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Credential file operation timed out after {0} ms")]
    Timeout(u128),

    #[error("Credential file is not valid JSON: {0}")]
    Parse(String),

    #[error("Failed to serialize credentials: {0}")]
    Serialize(String),
}

/// Errors raised by the session/transport registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Session '{0}' not found")]
    NotFound(String),

    #[error("Session '{session_id}' uses the {registered} transport, not {requested}")]
    KindMismatch {
        session_id: String,
        registered: TransportKind,
        requested: TransportKind,
    },

    #[error("Session '{0}' is closed")]
    Closed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AuthError::invalid_request("x").error_code(), "invalid_request");
        assert_eq!(AuthError::invalid_client("x").error_code(), "invalid_client");
        assert_eq!(AuthError::invalid_grant("x").error_code(), "invalid_grant");
        assert_eq!(
            AuthError::UnsupportedGrantType("x".into()).error_code(),
            "unsupported_grant_type"
        );
        assert_eq!(AuthError::unauthorized("x").error_code(), "unauthorized");
    }

    #[test]
    fn test_description_is_plain_text() {
        let err = AuthError::invalid_grant("Refresh token expired");
        assert_eq!(err.description(), "Refresh token expired");
        assert_eq!(err.to_string(), "invalid_grant: Refresh token expired");
    }

    #[test]
    fn test_kind_mismatch_message() {
        let err = SessionError::KindMismatch {
            session_id: "s1".to_string(),
            registered: TransportKind::Sse,
            requested: TransportKind::StreamableHttp,
        };
        assert_eq!(
            err.to_string(),
            "Session 's1' uses the SSE transport, not streamable HTTP"
        );
    }
}
