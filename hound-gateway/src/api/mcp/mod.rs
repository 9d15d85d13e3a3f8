//! MCP session transports. Both require a bearer token and share one
//! session id namespace through `hound_auth::SessionRegistry`.

pub mod error;
pub mod handler;
pub mod protocol;
pub mod sse;
pub mod streamable;

use crate::state::AppState;
use axum::routing::{get, post, Router};

/// Header carrying the streamable HTTP session id
pub const SESSION_ID_HEADER: &str = "mcp-session-id";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sse", get(sse::open))
        .route("/messages", post(sse::post_message))
        .route(
            "/",
            get(streamable::get)
                .post(streamable::post)
                .delete(streamable::delete),
        )
}
