use crate::api::oauth::models::{AuthorizationServerMetadata, ProtectedResourceMetadata};
use crate::headers::presets;
use crate::openapi::OAUTH_TAG;
use crate::state::AppState;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hound_auth::grants::{GRANT_AUTHORIZATION_CODE, GRANT_CLIENT_CREDENTIALS, GRANT_REFRESH_TOKEN};
use hound_auth::pkce::S256;
use http::HeaderMap;

const DISCOVERY_MAX_AGE: u32 = 3600;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// OAuth 2.0 Authorization Server Metadata (RFC 8414)
#[utoipa::path(
    get,
    path = "/.well-known/oauth-authorization-server",
    tag = OAUTH_TAG,
    responses(
        (status = 200, description = "Authorization server metadata", body = AuthorizationServerMetadata)
    )
)]
pub(crate) async fn authorization_server(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let base_url = state.base_url(&headers);
    let metadata = AuthorizationServerMetadata {
        issuer: base_url.clone(),
        authorization_endpoint: format!("{}/oauth/authorize", base_url),
        token_endpoint: format!("{}/oauth/token", base_url),
        registration_endpoint: format!("{}/oauth/register", base_url),
        token_endpoint_auth_methods_supported: strings(&[
            "client_secret_post",
            "client_secret_basic",
            "none",
        ]),
        grant_types_supported: strings(&[
            GRANT_CLIENT_CREDENTIALS,
            GRANT_AUTHORIZATION_CODE,
            GRANT_REFRESH_TOKEN,
        ]),
        response_types_supported: strings(&["code", "token"]),
        scopes_supported: vec![state.config.oauth.scope.clone()],
        code_challenge_methods_supported: strings(&[S256]),
    };

    let mut response = Json(metadata).into_response();
    presets::discovery(DISCOVERY_MAX_AGE).apply(&mut response);
    response
}

/// OAuth 2.0 Protected Resource Metadata (RFC 9728)
#[utoipa::path(
    get,
    path = "/.well-known/oauth-protected-resource",
    tag = OAUTH_TAG,
    responses(
        (status = 200, description = "Protected resource metadata", body = ProtectedResourceMetadata)
    )
)]
pub(crate) async fn protected_resource(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let base_url = state.base_url(&headers);
    let metadata = ProtectedResourceMetadata {
        resource: base_url.clone(),
        authorization_servers: vec![base_url],
        scopes_supported: vec![state.config.oauth.scope.clone()],
    };

    let mut response = Json(metadata).into_response();
    presets::discovery(DISCOVERY_MAX_AGE).apply(&mut response);
    response
}
