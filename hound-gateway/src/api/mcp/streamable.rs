//! Streamable HTTP transport on `/`. Each POST carries one JSON-RPC message and
//! gets its reply in the response. The `Mcp-Session-Id` header names the
//! session; the first successful exchange without one opens a new session.

use crate::api::authn_middleware::AuthenticatedClient;
use crate::api::mcp::error::TransportError;
use crate::api::mcp::handler::{dispatch, SessionContext};
use crate::api::mcp::protocol::IncomingMessage;
use crate::api::mcp::sse::{message_stream, open_session};
use crate::api::mcp::SESSION_ID_HEADER;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use hound_auth::{SessionError, SessionTransport, StreamableHttpTransport, TransportKind};
use http::header::ACCEPT;
use http::HeaderMap;
use log::{debug, info};
use uuid::Uuid;

fn session_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|id| !id.is_empty())
}

pub(crate) async fn post(
    State(state): State<AppState>,
    Extension(client): Extension<AuthenticatedClient>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, TransportError> {
    let existing = match session_header(&headers) {
        Some(id) => Some(state.sessions.resolve_owned(
            id,
            TransportKind::StreamableHttp,
            &client.client_id,
        )?),
        None => None,
    };

    let request = match IncomingMessage::parse(&body).map_err(TransportError::InvalidMessage)? {
        IncomingMessage::Request(request) => request,
        IncomingMessage::Response(_) => return Ok(StatusCode::ACCEPTED.into_response()),
    };

    let session_id = match session_header(&headers) {
        Some(id) if existing.is_some() => id.to_string(),
        _ => Uuid::new_v4().to_string(),
    };
    let ctx = SessionContext {
        session_id: session_id.clone(),
        client_id: client.client_id.clone(),
        transport: TransportKind::StreamableHttp,
    };

    let Some(reply) = dispatch(
        state.handler.as_ref(),
        &ctx,
        request,
        state.config.session_request_timeout(),
    )
    .await
    else {
        return Ok(StatusCode::ACCEPTED.into_response());
    };

    if existing.is_none() {
        if !reply.is_success() {
            debug!("Not opening a session for a failed first exchange");
            return Ok(Json(reply).into_response());
        }
        let transport = StreamableHttpTransport::new(&client.client_id);
        state
            .sessions
            .register(&session_id, SessionTransport::StreamableHttp(transport))?;
    }

    Ok(([(SESSION_ID_HEADER, session_id)], Json(reply)).into_response())
}

/// Attaches the notification stream of a session. Without a session header,
/// a client asking for an event stream gets a new SSE session instead.
pub(crate) async fn get(
    State(state): State<AppState>,
    Extension(client): Extension<AuthenticatedClient>,
    headers: HeaderMap,
) -> Result<Response, TransportError> {
    let Some(session_id) = session_header(&headers) else {
        let wants_events = headers
            .get(ACCEPT)
            .and_then(|h| h.to_str().ok())
            .is_some_and(|accept| accept.contains("text/event-stream"));
        if wants_events {
            return open_session(&state, &client);
        }
        return Err(TransportError::NoValidSession);
    };

    let transport = state
        .sessions
        .resolve_owned(session_id, TransportKind::StreamableHttp, &client.client_id)
        .map_err(|e| {
            debug!("GET without a valid streamable session: {}", e);
            TransportError::NoValidSession
        })?;

    let notifications = transport
        .as_streamable()
        .and_then(|t| t.take_stream())
        .ok_or_else(|| TransportError::StreamAlreadyAttached(session_id.to_string()))?;

    info!("Attached notification stream to session '{}'", session_id);
    let events = message_stream(notifications, transport.shutdown_token(), ());
    Ok(Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response())
}

/// Closes a session. Unknown ids succeed so that retries are harmless.
pub(crate) async fn delete(
    State(state): State<AppState>,
    Extension(client): Extension<AuthenticatedClient>,
    headers: HeaderMap,
) -> Result<StatusCode, TransportError> {
    let Some(session_id) = session_header(&headers) else {
        return Ok(StatusCode::OK);
    };

    match state
        .sessions
        .resolve_owned(session_id, TransportKind::StreamableHttp, &client.client_id)
    {
        Ok(_) => {
            state.sessions.close(session_id);
            Ok(StatusCode::OK)
        }
        Err(SessionError::NotFound(_) | SessionError::Closed(_)) => Ok(StatusCode::OK),
        Err(e @ SessionError::KindMismatch { .. }) => Err(e.into()),
    }
}
