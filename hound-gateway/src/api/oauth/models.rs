//! OAuth 2.0 request and response documents

use hound_auth::{ClientRegistration, TokenPair};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Authorization request query (RFC 6749 section 4.1.1). Every field is
/// optional here so that a missing one is reported as `invalid_request`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuthorizeQuery {
    /// Client identifier
    pub client_id: Option<String>,
    /// Where the code is sent after approval
    pub redirect_uri: Option<String>,
    /// Must be "code"
    pub response_type: Option<String>,
    /// Opaque value echoed back on the redirect
    pub state: Option<String>,
    /// PKCE code challenge
    pub code_challenge: Option<String>,
    /// PKCE method; only S256 is accepted
    pub code_challenge_method: Option<String>,
}

/// Token endpoint parameters, form or JSON encoded. Client credentials may
/// also arrive in an HTTP Basic header.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenRequest {
    /// client_credentials, authorization_code or refresh_token
    pub grant_type: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// For authorization_code
    pub code: Option<String>,
    /// For authorization_code; must match the authorization request
    pub redirect_uri: Option<String>,
    /// For authorization_code issued with PKCE
    pub code_verifier: Option<String>,
    /// For refresh_token
    pub refresh_token: Option<String>,
}

/// OAuth 2.0 Token Response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    /// Single use; redeeming it rotates the pair
    pub refresh_token: String,
    /// Always "Bearer"
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub scope: String,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: pair.token_type,
            expires_in: pair.expires_in,
            scope: pair.scope,
        }
    }
}

/// Dynamic client registration request (RFC 7591)
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegistrationRequest {
    /// Defaults to `dynamic-client-<epoch millis>`
    pub client_name: Option<String>,
    pub redirect_uris: Option<Vec<String>>,
    pub grant_types: Option<Vec<String>>,
    pub token_endpoint_auth_method: Option<String>,
}

/// Registered client, including the only copy of its secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RegistrationResponse {
    pub client_id: String,
    pub client_secret: String,
    pub client_name: String,
    /// Epoch seconds
    pub client_id_issued_at: i64,
    /// 0: never expires
    pub client_secret_expires_at: i64,
    pub grant_types: Vec<String>,
    pub redirect_uris: Vec<String>,
    pub response_types: Vec<String>,
    pub token_endpoint_auth_method: String,
    pub scope: String,
}

impl From<ClientRegistration> for RegistrationResponse {
    fn from(r: ClientRegistration) -> Self {
        Self {
            client_id: r.client_id,
            client_secret: r.client_secret,
            client_name: r.client_name,
            client_id_issued_at: r.client_id_issued_at,
            client_secret_expires_at: r.client_secret_expires_at,
            grant_types: r.grant_types,
            redirect_uris: r.redirect_uris,
            response_types: r.response_types,
            token_endpoint_auth_method: r.token_endpoint_auth_method,
            scope: r.scope,
        }
    }
}

/// Authorization server metadata (RFC 8414)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthorizationServerMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub registration_endpoint: String,
    pub token_endpoint_auth_methods_supported: Vec<String>,
    pub grant_types_supported: Vec<String>,
    pub response_types_supported: Vec<String>,
    pub scopes_supported: Vec<String>,
    pub code_challenge_methods_supported: Vec<String>,
}

/// Protected resource metadata (RFC 9728)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProtectedResourceMetadata {
    pub resource: String,
    pub authorization_servers: Vec<String>,
    pub scopes_supported: Vec<String>,
}
