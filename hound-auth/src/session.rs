//! Session/transport registry.
//!
//! Two transport protocols share one session id namespace. A session id is bound
//! to exactly one [`TransportKind`] for its whole life; addressing it with the
//! other kind yields [`SessionError::KindMismatch`], never a silent miss.

use crate::error::SessionError;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use log::{debug, info};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Sse,
    StreamableHttp,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sse => write!(f, "SSE"),
            Self::StreamableHttp => write!(f, "streamable HTTP"),
        }
    }
}

/// Server-sent-events session. Every server message, including replies,
/// travels over the event stream.
#[derive(Debug)]
pub struct SseTransport {
    client_id: String,
    outbound: mpsc::UnboundedSender<Value>,
    shutdown: CancellationToken,
}

impl SseTransport {
    /// Returns the transport and the receiving half that feeds the event stream
    pub fn new(client_id: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<Value>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let transport = Self {
            client_id: client_id.into(),
            outbound,
            shutdown: CancellationToken::new(),
        };
        (transport, rx)
    }

    /// Queue a message for the event stream
    pub fn send(&self, message: Value) -> Result<(), mpsc::error::SendError<Value>> {
        self.outbound.send(message)
    }
}

/// Request/response session. Replies go in the HTTP response; server-initiated
/// notifications wait for a client to attach the optional event stream.
#[derive(Debug)]
pub struct StreamableHttpTransport {
    client_id: String,
    notifications: mpsc::UnboundedSender<Value>,
    stream: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
    shutdown: CancellationToken,
}

impl StreamableHttpTransport {
    pub fn new(client_id: impl Into<String>) -> Self {
        let (notifications, rx) = mpsc::unbounded_channel();
        Self {
            client_id: client_id.into(),
            notifications,
            stream: Mutex::new(Some(rx)),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn notify(&self, message: Value) -> Result<(), mpsc::error::SendError<Value>> {
        self.notifications.send(message)
    }

    /// Hands out the notification stream. Only one stream may be attached.
    pub fn take_stream(&self) -> Option<mpsc::UnboundedReceiver<Value>> {
        self.stream.lock().take()
    }
}

/// A live transport, tagged by protocol
#[derive(Debug)]
pub enum SessionTransport {
    Sse(SseTransport),
    StreamableHttp(StreamableHttpTransport),
}

impl SessionTransport {
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Sse(_) => TransportKind::Sse,
            Self::StreamableHttp(_) => TransportKind::StreamableHttp,
        }
    }

    /// The client whose bearer token opened the session
    pub fn client_id(&self) -> &str {
        match self {
            Self::Sse(t) => &t.client_id,
            Self::StreamableHttp(t) => &t.client_id,
        }
    }

    /// Cancelled once the session is closed
    pub fn shutdown_token(&self) -> CancellationToken {
        match self {
            Self::Sse(t) => t.shutdown.clone(),
            Self::StreamableHttp(t) => t.shutdown.clone(),
        }
    }

    pub fn is_closed(&self) -> bool {
        match self {
            Self::Sse(t) => t.shutdown.is_cancelled(),
            Self::StreamableHttp(t) => t.shutdown.is_cancelled(),
        }
    }

    fn terminate(&self) {
        match self {
            Self::Sse(t) => t.shutdown.cancel(),
            Self::StreamableHttp(t) => t.shutdown.cancel(),
        }
    }

    pub fn as_sse(&self) -> Option<&SseTransport> {
        match self {
            Self::Sse(t) => Some(t),
            Self::StreamableHttp(_) => None,
        }
    }

    pub fn as_streamable(&self) -> Option<&StreamableHttpTransport> {
        match self {
            Self::StreamableHttp(t) => Some(t),
            Self::Sse(_) => None,
        }
    }
}

/// The only writer of the session id to transport mapping
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<SessionTransport>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `session_id` to `transport`.
    ///
    /// Registering an id again with the same kind returns the live entry and
    /// discards `transport`; a different kind is rejected.
    pub fn register(
        &self,
        session_id: impl Into<String>,
        transport: SessionTransport,
    ) -> Result<Arc<SessionTransport>, SessionError> {
        let session_id = session_id.into();
        match self.sessions.entry(session_id.clone()) {
            Entry::Occupied(entry) => {
                let existing = entry.get();
                if existing.kind() != transport.kind() {
                    return Err(SessionError::KindMismatch {
                        session_id,
                        registered: existing.kind(),
                        requested: transport.kind(),
                    });
                }
                Ok(Arc::clone(existing))
            }
            Entry::Vacant(entry) => {
                let kind = transport.kind();
                let transport = Arc::new(transport);
                entry.insert(Arc::clone(&transport));
                info!("Opened {} session '{}'", kind, session_id);
                Ok(transport)
            }
        }
    }

    /// Finds a live session of the expected kind
    pub fn resolve(
        &self,
        session_id: &str,
        expected: TransportKind,
    ) -> Result<Arc<SessionTransport>, SessionError> {
        let transport = self
            .sessions
            .get(session_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        if transport.is_closed() {
            self.sessions.remove(session_id);
            return Err(SessionError::Closed(session_id.to_string()));
        }

        if transport.kind() != expected {
            return Err(SessionError::KindMismatch {
                session_id: session_id.to_string(),
                registered: transport.kind(),
                requested: expected,
            });
        }

        Ok(transport)
    }

    /// Like [`resolve`](Self::resolve), but a session opened by another client
    /// is reported as not found.
    pub fn resolve_owned(
        &self,
        session_id: &str,
        expected: TransportKind,
        client_id: &str,
    ) -> Result<Arc<SessionTransport>, SessionError> {
        let transport = self.resolve(session_id, expected)?;
        if transport.client_id() != client_id {
            debug!(
                "Client '{}' addressed session '{}' owned by another client",
                client_id, session_id
            );
            return Err(SessionError::NotFound(session_id.to_string()));
        }
        Ok(transport)
    }

    /// Removes the session and signals its transport to shut down.
    /// Returns `false` if there was nothing to close.
    pub fn close(&self, session_id: &str) -> bool {
        match self.sessions.remove(session_id) {
            Some((_, transport)) => {
                transport.terminate();
                info!("Closed {} session '{}'", transport.kind(), session_id);
                true
            }
            None => false,
        }
    }

    /// Closes every session owned by `client_id`
    pub fn close_client(&self, client_id: &str) -> usize {
        let ids: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().client_id() == client_id)
            .map(|entry| entry.key().clone())
            .collect();
        ids.iter().filter(|id| self.close(id)).count()
    }

    pub fn close_all(&self) -> usize {
        let ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.iter().filter(|id| self.close(id)).count()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sse(client_id: &str) -> SessionTransport {
        SessionTransport::Sse(SseTransport::new(client_id).0)
    }

    fn streamable(client_id: &str) -> SessionTransport {
        SessionTransport::StreamableHttp(StreamableHttpTransport::new(client_id))
    }

    #[test]
    fn test_kind_mismatch_is_distinct_from_not_found() {
        let registry = SessionRegistry::new();
        registry.register("s1", sse("mcp_a")).unwrap();

        assert!(matches!(
            registry.resolve("s1", TransportKind::StreamableHttp),
            Err(SessionError::KindMismatch {
                registered: TransportKind::Sse,
                requested: TransportKind::StreamableHttp,
                ..
            })
        ));
        assert_eq!(
            registry.resolve("s2", TransportKind::Sse).unwrap_err(),
            SessionError::NotFound("s2".to_string())
        );
        assert!(registry.resolve("s1", TransportKind::Sse).is_ok());
    }

    #[test]
    fn test_register_other_kind_is_rejected() {
        let registry = SessionRegistry::new();
        registry.register("s1", streamable("mcp_a")).unwrap();

        assert!(matches!(
            registry.register("s1", sse("mcp_a")),
            Err(SessionError::KindMismatch { .. })
        ));
        assert_eq!(
            registry.resolve("s1", TransportKind::StreamableHttp).unwrap().kind(),
            TransportKind::StreamableHttp
        );
    }

    #[test]
    fn test_register_same_kind_keeps_existing() {
        let registry = SessionRegistry::new();
        let first = registry.register("s1", streamable("mcp_a")).unwrap();
        let second = registry.register("s1", streamable("mcp_a")).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_close_is_idempotent_and_signals() {
        let registry = SessionRegistry::new();
        let transport = registry.register("s1", sse("mcp_a")).unwrap();
        let token = transport.shutdown_token();

        assert!(registry.close("s1"));
        assert!(token.is_cancelled());
        assert!(!registry.close("s1"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_resolve_owned_hides_foreign_sessions() {
        let registry = SessionRegistry::new();
        registry.register("s1", sse("mcp_a")).unwrap();

        assert!(registry.resolve_owned("s1", TransportKind::Sse, "mcp_a").is_ok());
        assert_eq!(
            registry
                .resolve_owned("s1", TransportKind::Sse, "mcp_b")
                .unwrap_err(),
            SessionError::NotFound("s1".to_string())
        );
    }

    #[test]
    fn test_close_client_and_close_all() {
        let registry = SessionRegistry::new();
        registry.register("a1", sse("mcp_a")).unwrap();
        registry.register("a2", streamable("mcp_a")).unwrap();
        registry.register("b1", sse("mcp_b")).unwrap();

        assert_eq!(registry.close_client("mcp_a"), 2);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.close_all(), 1);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_sse_messages_reach_stream() {
        let (transport, mut rx) = SseTransport::new("mcp_a");
        transport.send(json!({"jsonrpc": "2.0", "id": 1})).unwrap();
        assert_eq!(rx.recv().await.unwrap()["id"], 1);
    }

    #[test]
    fn test_streamable_stream_attaches_once() {
        let transport = StreamableHttpTransport::new("mcp_a");
        assert!(transport.take_stream().is_some());
        assert!(transport.take_stream().is_none());
    }
}
