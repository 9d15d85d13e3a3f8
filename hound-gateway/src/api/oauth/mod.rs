//! OAuth 2.0 authorization server endpoints
//!
//! ## Supported flows
//! - Client Credentials Grant (RFC 6749 Section 4.4)
//! - Authorization Code Grant with PKCE S256 (RFC 6749 Section 4.1, RFC 7636)
//! - Refresh Token rotation (RFC 6749 Section 6)
//! - Dynamic Client Registration (RFC 7591)
//! - Authorization Server and Protected Resource Metadata (RFC 8414, RFC 9728)
//!
//! Client credentials live in the JSON credential file owned by
//! `hound_auth::CredentialStore`; tokens and codes are held in memory.

pub mod extract;
pub mod handlers;
pub mod metadata;
pub mod models;

use crate::state::AppState;
use axum::routing::{get, post, Router};

/// Creates OAuth 2.0 routes. None of them require a bearer token.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/oauth/token", post(handlers::token))
        .route(
            "/oauth/authorize",
            get(handlers::authorize).post(handlers::approve),
        )
        .route("/oauth/register", post(handlers::register))
        .route(
            "/.well-known/oauth-authorization-server",
            get(metadata::authorization_server),
        )
        .route(
            "/.well-known/oauth-protected-resource",
            get(metadata::protected_resource),
        )
}
