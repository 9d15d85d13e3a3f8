use crate::openapi::HEALTH_TAG;
use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Basic health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Health {
    status: String,
    mode: String,
    port: u16,
    /// Open sessions across both transports
    sessions: usize,
    /// Live access tokens
    access_tokens: usize,
    /// Live refresh tokens
    refresh_tokens: usize,
    /// Authorization codes waiting to be exchanged
    pending_codes: usize,
}

/// Basic health check handler
#[utoipa::path(
    get,
    path = "/health",
    tag = HEALTH_TAG,
    responses(
        (status = 200, description = "Service is healthy", body = Health)
    )
)]
pub(crate) async fn health_check(State(state): State<AppState>) -> Json<Health> {
    let stats = state.auth.stats();
    Json(Health {
        status: "ok".to_string(),
        mode: "http".to_string(),
        port: state.config.port,
        sessions: state.sessions.len(),
        access_tokens: stats.access_tokens,
        refresh_tokens: stats.refresh_tokens,
        pending_codes: stats.codes,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
