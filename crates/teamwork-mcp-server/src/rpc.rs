// crates/teamwork-mcp-server/src/rpc.rs
// ============================================================================
// Module: JSON-RPC Envelope
// Description: JSON-RPC 2.0 request/response shapes and error codes.
// Purpose: Share protocol framing types between middleware and transports.
// Dependencies: serde, serde_json, teamwork-mcp-core
// ============================================================================

//! ## Overview
//! Envelope types for the JSON-RPC 2.0 surface. Error codes follow the
//! protocol's reserved range for standard failures and a server range for
//! authorization outcomes, so the transport can map authorization errors to
//! 401/403 rather than a 500-equivalent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use teamwork_mcp_core::ToolDefinition;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Supported JSON-RPC protocol version.
pub const JSONRPC_VERSION: &str = "2.0";

/// Invalid request envelope.
pub const CODE_INVALID_REQUEST: i64 = -32600;
/// Unknown method or tool.
pub const CODE_METHOD_NOT_FOUND: i64 = -32601;
/// Invalid call parameters.
pub const CODE_INVALID_PARAMS: i64 = -32602;
/// Missing or failed authentication.
pub const CODE_UNAUTHENTICATED: i64 = -32001;
/// Authenticated but not authorized.
pub const CODE_FORBIDDEN: i64 = -32003;
/// Upstream collaborator failure during a tool call.
pub const CODE_UPSTREAM: i64 = -32020;
/// Unexpected internal failure.
pub const CODE_INTERNAL: i64 = -32050;
/// Response serialization failure.
pub const CODE_SERIALIZATION: i64 = -32060;
/// Request body over the configured limit.
pub const CODE_PAYLOAD_TOO_LARGE: i64 = -32070;

// ============================================================================
// SECTION: Envelope Types
// ============================================================================

/// Incoming JSON-RPC request payload.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC protocol version.
    pub jsonrpc: String,
    /// Request identifier; null for notifications.
    #[serde(default)]
    pub id: Value,
    /// Method name.
    pub method: String,
    /// Optional parameters payload.
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC protocol version.
    pub jsonrpc: String,
    /// Request identifier.
    pub id: Value,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
}

/// Tool list response payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolListResult {
    /// Exposed tool definitions in registration order.
    pub tools: Vec<ToolDefinition>,
}

/// Tool call response payload.
#[derive(Debug, Serialize)]
pub struct ToolCallResult {
    /// Tool output content.
    pub content: Vec<ToolContent>,
}

/// Tool output payloads for JSON-RPC responses.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolContent {
    /// JSON tool output.
    Json {
        /// JSON payload.
        json: Value,
    },
}

// ============================================================================
// SECTION: Response Builders
// ============================================================================

/// Builds a successful response.
#[must_use]
pub fn result_response(id: Value, result: Value) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: JSONRPC_VERSION.to_string(),
        id,
        result: Some(result),
        error: None,
    }
}

/// Builds an error response.
#[must_use]
pub fn error_response(id: Value, code: i64, message: impl Into<String>) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: JSONRPC_VERSION.to_string(),
        id,
        result: None,
        error: Some(JsonRpcError {
            code,
            message: message.into(),
        }),
    }
}
