//! Server-sent-events transport: the client holds `GET /sse` open and posts
//! its messages to `/messages?sessionId=<id>`. Replies travel on the stream.

use crate::api::authn_middleware::AuthenticatedClient;
use crate::api::mcp::error::TransportError;
use crate::api::mcp::handler::{dispatch, SessionContext};
use crate::api::mcp::protocol::IncomingMessage;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use futures::stream::{self, Stream, StreamExt};
use hound_auth::{SessionRegistry, SessionTransport, SseTransport, TransportKind};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// Closes the session when the event stream is dropped
struct SessionGuard {
    sessions: Arc<SessionRegistry>,
    session_id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.sessions.close(&self.session_id) {
            debug!("SSE stream for session '{}' went away", self.session_id);
        }
    }
}

pub(crate) async fn open(
    State(state): State<AppState>,
    Extension(client): Extension<AuthenticatedClient>,
) -> Result<Response, TransportError> {
    open_session(&state, &client)
}

/// Registers a new SSE session and returns its event stream. The first event
/// names the endpoint for posting messages.
pub(crate) fn open_session(
    state: &AppState,
    client: &AuthenticatedClient,
) -> Result<Response, TransportError> {
    let session_id = Uuid::new_v4().to_string();
    let (transport, outbound) = SseTransport::new(&client.client_id);
    let transport = state
        .sessions
        .register(&session_id, SessionTransport::Sse(transport))?;

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/messages?sessionId={}", session_id));
    let guard = SessionGuard {
        sessions: Arc::clone(&state.sessions),
        session_id,
    };

    let events = stream::once(async move { Ok::<_, Infallible>(endpoint) }).chain(
        message_stream(outbound, transport.shutdown_token(), guard),
    );
    Ok(Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response())
}

/// Forwards queued messages as `message` events until the session shuts down
/// or every sender is gone. `guard` lives as long as the stream.
pub(crate) fn message_stream<G: Send + 'static>(
    outbound: UnboundedReceiver<Value>,
    shutdown: CancellationToken,
    guard: G,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    stream::unfold(
        (outbound, shutdown, guard),
        |(mut outbound, shutdown, guard)| async move {
            let message = tokio::select! {
                _ = shutdown.cancelled() => None,
                message = outbound.recv() => message,
            }?;
            let event = Event::default().event("message").data(message.to_string());
            Some((Ok(event), (outbound, shutdown, guard)))
        },
    )
}

pub(crate) async fn post_message(
    State(state): State<AppState>,
    Extension(client): Extension<AuthenticatedClient>,
    Query(query): Query<MessagesQuery>,
    body: Bytes,
) -> Result<Response, TransportError> {
    let session_id = query
        .session_id
        .filter(|id| !id.is_empty())
        .ok_or(TransportError::MissingSessionId)?;

    let transport =
        state
            .sessions
            .resolve_owned(&session_id, TransportKind::Sse, &client.client_id)?;

    let request = match IncomingMessage::parse(&body).map_err(TransportError::InvalidMessage)? {
        IncomingMessage::Request(request) => request,
        IncomingMessage::Response(_) => {
            debug!("Ignoring client response on SSE session '{}'", session_id);
            return Ok(StatusCode::ACCEPTED.into_response());
        }
    };

    let ctx = SessionContext {
        session_id,
        client_id: client.client_id,
        transport: TransportKind::Sse,
    };
    let handler = Arc::clone(&state.handler);
    let timeout = state.config.session_request_timeout();

    tokio::spawn(async move {
        let Some(reply) = dispatch(handler.as_ref(), &ctx, request, timeout).await else {
            return;
        };
        let Some(sse) = transport.as_sse() else {
            return;
        };
        match serde_json::to_value(&reply) {
            Ok(value) => {
                if sse.send(value).is_err() {
                    debug!("Session '{}' closed before its reply", ctx.session_id);
                }
            }
            Err(e) => warn!("Failed to encode reply on '{}': {}", ctx.session_id, e),
        }
    });

    Ok(StatusCode::ACCEPTED.into_response())
}
