use crate::api::oauth::extract::TokenRequestExtractor;
use crate::api::oauth::models::{
    AuthorizeQuery, RegistrationRequest, RegistrationResponse, TokenRequest, TokenResponse,
};
use crate::errors::{ApiError, OAuthErrorBody};
use crate::headers::presets;
use crate::openapi::OAUTH_TAG;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use hound_auth::pkce::S256;
use hound_auth::{ClientRegistrationRequest, ClientSummary, GrantRequest, PkceChallenge};
use http::header::LOCATION;
use log::{debug, info, warn};
use url::Url;

const MISSING_AUTHORIZE_PARAMS: &str =
    "Missing required parameters: client_id, redirect_uri, response_type=code";

/// OAuth 2.0 Token Endpoint
///
/// Supports client_credentials, authorization_code (with PKCE) and
/// refresh_token. Client credentials may be sent in the body or as HTTP Basic.
#[utoipa::path(
    post,
    path = "/oauth/token",
    tag = OAUTH_TAG,
    request_body(content = TokenRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Token pair issued", body = TokenResponse),
        (status = 400, description = "Invalid request or grant", body = OAuthErrorBody),
        (status = 401, description = "Client authentication failed", body = OAuthErrorBody),
    )
)]
pub(crate) async fn token(
    State(state): State<AppState>,
    TokenRequestExtractor(params): TokenRequestExtractor,
) -> Result<Response, ApiError> {
    let grant = GrantRequest::try_from(params)?;
    debug!("Token request with grant type {}", grant.grant_type());

    let pair = state.auth.grant(grant).await?;

    let mut response = Json(TokenResponse::from(pair)).into_response();
    presets::no_store().apply(&mut response);
    Ok(response)
}

/// OAuth 2.0 Authorization Endpoint
///
/// Renders the approval page. The page's form posts back to the same URL.
#[utoipa::path(
    get,
    path = "/oauth/authorize",
    tag = OAUTH_TAG,
    params(AuthorizeQuery),
    responses(
        (status = 200, description = "Approval page", content_type = "text/html", body = String),
        (status = 400, description = "Invalid authorization request", body = OAuthErrorBody),
    )
)]
pub(crate) async fn authorize(
    State(state): State<AppState>,
    query: Result<Query<AuthorizeQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let request = validate_authorization(&state, query).await?;
    Ok(Html(consent_page(&request.client)).into_response())
}

/// Approves an authorization request and redirects back with a code
#[utoipa::path(
    post,
    path = "/oauth/authorize",
    tag = OAUTH_TAG,
    params(AuthorizeQuery),
    responses(
        (status = 302, description = "Redirect to redirect_uri with code and state"),
        (status = 400, description = "Invalid authorization request", body = OAuthErrorBody),
    )
)]
pub(crate) async fn approve(
    State(state): State<AppState>,
    query: Result<Query<AuthorizeQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let request = validate_authorization(&state, query).await?;

    let code = state.auth.create_authorization_code(
        &request.client.client_id,
        &request.redirect_uri,
        request.pkce,
    );

    let mut location = request.redirect_url;
    {
        let mut pairs = location.query_pairs_mut();
        pairs.append_pair("code", &code);
        if let Some(s) = &request.state {
            pairs.append_pair("state", s);
        }
    }

    info!(
        "Approved authorization request for client '{}'",
        request.client.client_id
    );
    Ok((StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response())
}

/// Dynamic Client Registration (RFC 7591)
#[utoipa::path(
    post,
    path = "/oauth/register",
    tag = OAUTH_TAG,
    request_body = RegistrationRequest,
    responses(
        (status = 201, description = "Client registered", body = RegistrationResponse),
        (status = 400, description = "Malformed client metadata", body = OAuthErrorBody),
    )
)]
pub(crate) async fn register(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request: ClientRegistrationRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!("Rejected client registration: {}", e);
        ApiError::invalid_client_metadata()
    })?;

    let registration = state.auth.register_client(request).await?;
    info!(
        "Registered client '{}' ({})",
        registration.client_id, registration.client_name
    );

    let mut response = (
        StatusCode::CREATED,
        Json(RegistrationResponse::from(registration)),
    )
        .into_response();
    presets::no_store().apply(&mut response);
    Ok(response)
}

/// An authorization request that passed validation
#[derive(Debug)]
struct ValidatedAuthorization {
    client: ClientSummary,
    /// As supplied; token exchange compares against this exact string
    redirect_uri: String,
    redirect_url: Url,
    state: Option<String>,
    pkce: Option<PkceChallenge>,
}

async fn validate_authorization(
    state: &AppState,
    query: Result<Query<AuthorizeQuery>, QueryRejection>,
) -> Result<ValidatedAuthorization, ApiError> {
    let Query(query) = query.map_err(|e| {
        warn!("Rejected authorization query: {}", e);
        ApiError::invalid_request(MISSING_AUTHORIZE_PARAMS)
    })?;

    let (Some(client_id), Some(redirect_uri), Some("code")) = (
        non_empty(query.client_id),
        non_empty(query.redirect_uri),
        query.response_type.as_deref(),
    ) else {
        return Err(ApiError::invalid_request(MISSING_AUTHORIZE_PARAMS));
    };

    let redirect_url = Url::parse(&redirect_uri)
        .map_err(|_| ApiError::invalid_request("Invalid redirect_uri"))?;

    let pkce = match non_empty(query.code_challenge) {
        Some(challenge) => match query.code_challenge_method.as_deref() {
            Some(S256) => Some(PkceChallenge::new(challenge, Some(S256.to_string()))),
            _ => {
                return Err(ApiError::invalid_request(
                    "Unsupported code_challenge_method; only S256 is supported",
                ))
            }
        },
        None => None,
    };

    let Some(client) = state.auth.find_client(&client_id).await else {
        warn!("Authorization request for unknown client '{}'", client_id);
        return Err(ApiError::invalid_request("Unknown client_id"));
    };

    Ok(ValidatedAuthorization {
        client,
        redirect_uri,
        redirect_url,
        state: non_empty(query.state),
        pkce,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn consent_page(client: &ClientSummary) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Authorize MCP-Hound</title></head>
<body>
<h1>Authorize access</h1>
<p><strong>{name}</strong> (<code>{id}</code>) is requesting access to MCP-Hound code search.</p>
<form method="post">
<button type="submit">Approve</button>
</form>
</body>
</html>"#,
        name = escape_html(&client.name),
        id = escape_html(&client.client_id),
    )
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
