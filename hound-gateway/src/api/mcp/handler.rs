//! Dispatch seam between the session transports and the tool layer.

use crate::api::mcp::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use async_trait::async_trait;
use hound_auth::TransportKind;
use log::{debug, warn};
use serde_json::{json, Value};
use std::time::Duration;

pub const SERVER_NAME: &str = "mcp-hound";
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-03-26";

/// Who is talking, and over what
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub session_id: String,
    pub client_id: String,
    pub transport: TransportKind,
}

/// Answers JSON-RPC requests arriving on a session
#[async_trait]
pub trait SessionHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &SessionContext,
        request: &JsonRpcRequest,
    ) -> Result<Value, JsonRpcError>;
}

/// Built-in handler: protocol handshake and liveness only. Code search tools
/// are registered by the tool layer, which plugs in its own handler.
#[derive(Debug, Clone, Default)]
pub struct GatewayHandler;

#[async_trait]
impl SessionHandler for GatewayHandler {
    async fn handle(
        &self,
        ctx: &SessionContext,
        request: &JsonRpcRequest,
    ) -> Result<Value, JsonRpcError> {
        match request.method.as_str() {
            "initialize" => {
                let protocol_version = request
                    .params
                    .as_ref()
                    .and_then(|p| p.get("protocolVersion"))
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_PROTOCOL_VERSION);
                debug!(
                    "Initializing {} session '{}' at protocol {}",
                    ctx.transport, ctx.session_id, protocol_version
                );
                Ok(json!({
                    "protocolVersion": protocol_version,
                    "capabilities": { "tools": { "listChanged": false } },
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }))
            }
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": [] })),
            other => Err(JsonRpcError::method_not_found(other)),
        }
    }
}

/// Runs one request through `handler`, bounded by `timeout`.
/// Returns `None` for notifications.
pub async fn dispatch(
    handler: &dyn SessionHandler,
    ctx: &SessionContext,
    request: JsonRpcRequest,
    timeout: Duration,
) -> Option<JsonRpcResponse> {
    let outcome = tokio::time::timeout(timeout, handler.handle(ctx, &request)).await;

    let Some(id) = request.id else {
        match outcome {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => debug!("Notification '{}' not handled: {}", request.method, e.message),
            Err(_) => warn!("Notification '{}' timed out", request.method),
        }
        return None;
    };

    let response = match outcome {
        Ok(Ok(result)) => JsonRpcResponse::success(id, result),
        Ok(Err(error)) => JsonRpcResponse::failure(id, error),
        Err(_) => {
            warn!(
                "Request '{}' on session '{}' timed out after {:?}",
                request.method, ctx.session_id, timeout
            );
            JsonRpcResponse::failure(id, JsonRpcError::request_timeout(timeout.as_millis()))
        }
    };
    Some(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mcp::protocol::{JSONRPC_VERSION, METHOD_NOT_FOUND, REQUEST_TIMEOUT};

    fn ctx() -> SessionContext {
        SessionContext {
            session_id: "s1".to_string(),
            client_id: "mcp_a".to_string(),
            transport: TransportKind::StreamableHttp,
        }
    }

    fn request(id: Option<Value>, method: &str) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.to_string(),
            params: None,
        }
    }

    struct SlowHandler;

    #[async_trait]
    impl SessionHandler for SlowHandler {
        async fn handle(
            &self,
            _ctx: &SessionContext,
            _request: &JsonRpcRequest,
        ) -> Result<Value, JsonRpcError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(json!({}))
        }
    }

    #[tokio::test]
    async fn test_initialize_echoes_protocol_version() {
        let mut init = request(Some(json!(1)), "initialize");
        init.params = Some(json!({"protocolVersion": "2024-11-05"}));

        let response = dispatch(&GatewayHandler, &ctx(), init, Duration::from_secs(1))
            .await
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let response = dispatch(
            &GatewayHandler,
            &ctx(),
            request(Some(json!("x")), "tools/call"),
            Duration::from_secs(1),
        )
        .await
        .unwrap();
        assert_eq!(response.error.unwrap().code, METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_notifications_get_no_reply() {
        let response = dispatch(
            &GatewayHandler,
            &ctx(),
            request(None, "notifications/initialized"),
            Duration::from_secs(1),
        )
        .await;
        assert!(response.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_distinct_error() {
        let response = dispatch(
            &SlowHandler,
            &ctx(),
            request(Some(json!(2)), "tools/call"),
            Duration::from_millis(50),
        )
        .await
        .unwrap();
        assert_eq!(response.error.unwrap().code, REQUEST_TIMEOUT);
    }
}
