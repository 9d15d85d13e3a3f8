//! JSON-RPC 2.0 message shapes used on both session transports.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Server-defined: the handler did not answer in time
pub const REQUEST_TIMEOUT: i64 = -32001;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    /// Absent for notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, format!("Method not found: {}", method))
    }

    pub fn request_timeout(timeout_ms: u128) -> Self {
        Self::new(
            REQUEST_TIMEOUT,
            format!("Request timed out after {} ms", timeout_ms),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// What a client posted to a session
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingMessage {
    Request(JsonRpcRequest),
    /// A reply to a server-initiated request; nothing to dispatch
    Response(Value),
}

impl IncomingMessage {
    /// Classifies a posted body. Batches are not accepted.
    pub fn parse(body: &[u8]) -> Result<Self, JsonRpcError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| JsonRpcError::new(PARSE_ERROR, format!("Parse error: {}", e)))?;

        if !value.is_object() {
            return Err(JsonRpcError::new(
                INVALID_REQUEST,
                "Expected a single JSON-RPC message object",
            ));
        }

        if value.get("method").is_some() {
            let request: JsonRpcRequest = serde_json::from_value(value)
                .map_err(|e| JsonRpcError::new(INVALID_REQUEST, format!("Invalid request: {}", e)))?;
            if request.jsonrpc != JSONRPC_VERSION {
                return Err(JsonRpcError::new(
                    INVALID_REQUEST,
                    "Unsupported jsonrpc version",
                ));
            }
            return Ok(Self::Request(request));
        }

        if value.get("result").is_some() || value.get("error").is_some() {
            return Ok(Self::Response(value));
        }

        Err(JsonRpcError::new(INVALID_REQUEST, "Not a JSON-RPC message"))
    }
}
