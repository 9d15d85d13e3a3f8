use crate::errors::ApiError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use hound_auth::AuthError;
use http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use http::{HeaderValue, Method};
use log::{debug, warn};

/// The client behind a validated bearer token, available to handlers as an
/// `Extension`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedClient {
    pub client_id: String,
}

pub(crate) async fn authentication_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    // CORS preflight carries no credentials
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let Some(token) = token else {
        warn!("Missing or malformed bearer token on {}", request.uri().path());
        return unauthorized(&state, &request);
    };

    match state.auth.validate_bearer(token) {
        Some(identity) => {
            debug!("Authenticated client '{}'", identity.client_id);
            request.extensions_mut().insert(AuthenticatedClient {
                client_id: identity.client_id,
            });
            next.run(request).await
        }
        None => {
            warn!("Rejected invalid or expired bearer token");
            unauthorized(&state, &request)
        }
    }
}

/// 401 with an RFC 9728 challenge pointing at the protected-resource metadata
fn unauthorized(state: &AppState, request: &Request<Body>) -> Response {
    let base_url = state.base_url(request.headers());
    let challenge = format!(
        r#"Bearer realm="mcp", resource_metadata="{}/.well-known/oauth-protected-resource""#,
        base_url
    );

    let mut response =
        ApiError::from(AuthError::unauthorized("Valid bearer token required")).into_response();
    match HeaderValue::from_str(&challenge) {
        Ok(value) => {
            response.headers_mut().insert(WWW_AUTHENTICATE, value);
        }
        Err(e) => warn!("Cannot send bearer challenge for '{}': {}", base_url, e),
    }
    response
}
