mod authn_middleware;
pub(crate) mod health;
pub(crate) mod mcp;
pub(crate) mod oauth;

use crate::api::authn_middleware::authentication_middleware;
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::{middleware, Router};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderName, HeaderValue, Method};
use log::warn;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Combines all API routes into a single router
pub(super) fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(oauth::router())
        .merge(protected_routes(state))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(cors_layer(state.config.cors_allowed_origin.as_deref()))
}

/// Session transports; every request needs a valid bearer token
fn protected_routes(state: &AppState) -> Router<AppState> {
    // route_layer: unmatched paths stay 404 rather than 401
    mcp::router().route_layer(middleware::from_fn_with_state(
        state.clone(),
        authentication_middleware,
    ))
}

/// With no configured origin every origin is mirrored back; otherwise only
/// the configured one receives CORS headers.
fn cors_layer(allowed_origin: Option<&str>) -> CorsLayer {
    let session_header = HeaderName::from_static(mcp::SESSION_ID_HEADER);
    let origin = match allowed_origin {
        None => AllowOrigin::mirror_request(),
        Some(origin) => match HeaderValue::from_str(origin) {
            Ok(value) => AllowOrigin::exact(value),
            Err(e) => {
                warn!("Ignoring unusable CORS origin '{}': {}", origin, e);
                AllowOrigin::list(Vec::<HeaderValue>::new())
            }
        },
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION, session_header.clone()])
        .expose_headers([session_header])
}
