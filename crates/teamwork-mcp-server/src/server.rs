// crates/teamwork-mcp-server/src/server.rs
// ============================================================================
// Module: MCP Server
// Description: JSON-RPC dispatch and stdio/HTTP transports.
// Purpose: Expose enabled Teamwork toolsets behind the middleware pipeline.
// Dependencies: teamwork-mcp-core, axum, tokio
// ============================================================================

//! ## Overview
//! The server exposes the enabled toolset surface over JSON-RPC 2.0 on stdio
//! or HTTP. Every request runs through the middleware pipeline: the
//! authentication gate first, then dispatch, then the scope filter for
//! tool-listing responses. The tool table is built once at startup from the
//! toolset group and is immutable afterwards; per-request failures never
//! touch it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Bytes;
use axum::extract::ConnectInfo;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use axum::routing::post;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use teamwork_mcp_core::HandlerError;
use teamwork_mcp_core::MethodRegistry;
use teamwork_mcp_core::ToolDefinition;
use teamwork_mcp_core::ToolSink;
use teamwork_mcp_core::ToolWrapper;
use teamwork_mcp_core::Toolset;
use teamwork_mcp_core::ToolsetGroup;

use crate::auth::AuthGate;
use crate::auth::RequestContext;
use crate::auth::StaticTokenVerifier;
use crate::auth::StderrAuditSink;
use crate::config::ServerTransport;
use crate::config::TeamworkMcpConfig;
use crate::middleware::AuthGateMiddleware;
use crate::middleware::CallContext;
use crate::middleware::Endpoint;
use crate::middleware::Middleware;
use crate::middleware::Pipeline;
use crate::middleware::ScopeFilterMiddleware;
use crate::rpc::CODE_FORBIDDEN;
use crate::rpc::CODE_INTERNAL;
use crate::rpc::CODE_INVALID_PARAMS;
use crate::rpc::CODE_INVALID_REQUEST;
use crate::rpc::CODE_METHOD_NOT_FOUND;
use crate::rpc::CODE_PAYLOAD_TOO_LARGE;
use crate::rpc::CODE_SERIALIZATION;
use crate::rpc::CODE_UNAUTHENTICATED;
use crate::rpc::CODE_UPSTREAM;
use crate::rpc::JSONRPC_VERSION;
use crate::rpc::JsonRpcRequest;
use crate::rpc::JsonRpcResponse;
use crate::rpc::ToolCallResult;
use crate::rpc::ToolContent;
use crate::rpc::ToolListResult;
use crate::rpc::error_response;
use crate::rpc::result_response;
use crate::scope::ScopeFilter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// MCP protocol version advertised by `initialize`.
const PROTOCOL_VERSION: &str = "2024-11-05";
/// Server name advertised by `initialize`.
const SERVER_NAME: &str = "teamwork-mcp";
/// Environment variable carrying the bearer token for stdio sessions.
pub const STDIO_TOKEN_ENV_VAR: &str = "TEAMWORK_MCP_TOKEN";

// ============================================================================
// SECTION: Tool Table
// ============================================================================

/// Transport-side table of exposed tools, built once at startup.
///
/// # Invariants
/// - Holds exactly the tools the toolset group computed as exposable.
/// - Immutable once the server starts accepting traffic.
#[derive(Default)]
pub struct ToolTable {
    /// Exposed tools in registration order.
    order: Vec<ToolWrapper>,
    /// Index from method name into `order`.
    index: BTreeMap<String, usize>,
    /// Method names registered more than once.
    duplicates: Vec<String>,
}

impl ToolTable {
    /// Returns the exposed tool definitions in registration order.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order.iter().map(|tool| tool.definition().clone()).collect()
    }

    /// Looks up an exposed tool by method name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&ToolWrapper> {
        self.index.get(name).map(|&position| &self.order[position])
    }

    /// Returns duplicate registrations observed while building the table.
    #[must_use]
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    /// Returns the number of exposed tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl ToolSink for ToolTable {
    fn add_tool(&mut self, tool: ToolWrapper) {
        let name = tool.method().as_str().to_string();
        if self.index.contains_key(&name) {
            self.duplicates.push(name);
            return;
        }
        self.index.insert(name, self.order.len());
        self.order.push(tool);
    }
}

// ============================================================================
// SECTION: Dispatch Endpoint
// ============================================================================

/// Tool call parameters for JSON-RPC requests.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Raw JSON arguments.
    #[serde(default)]
    arguments: Value,
}

/// Terminal dispatch endpoint over the tool table.
pub struct Dispatcher {
    /// Exposed tool table.
    table: ToolTable,
}

impl Dispatcher {
    /// Creates a dispatcher over a built tool table.
    #[must_use]
    pub const fn new(table: ToolTable) -> Self {
        Self {
            table,
        }
    }

    /// Handles `initialize`.
    fn handle_initialize(id: Value) -> JsonRpcResponse {
        result_response(id, json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            },
        }))
    }

    /// Handles `tools/list`.
    fn handle_tools_list(&self, id: Value) -> JsonRpcResponse {
        let listing = ToolListResult {
            tools: self.table.definitions(),
        };
        match serde_json::to_value(listing) {
            Ok(value) => result_response(id, value),
            Err(_) => error_response(id, CODE_SERIALIZATION, "serialization failed"),
        }
    }

    /// Handles `tools/call`.
    async fn handle_tools_call(
        &self,
        call: &CallContext,
        id: Value,
        params: Option<Value>,
    ) -> JsonRpcResponse {
        let params = params.unwrap_or(Value::Null);
        let Ok(call_params) = serde_json::from_value::<ToolCallParams>(params) else {
            return error_response(id, CODE_INVALID_PARAMS, "invalid tool params");
        };
        let Some(tool) = self.table.lookup(&call_params.name) else {
            // Unknown, disabled, and write-in-read-only tools are
            // indistinguishable here: none of them is exposed.
            return error_response(id, CODE_METHOD_NOT_FOUND, "unknown tool");
        };
        let handler = tool.handler();
        match handler.call(call_params.arguments, &call.auth.claims).await {
            Ok(output) => {
                let result = ToolCallResult {
                    content: vec![ToolContent::Json {
                        json: output,
                    }],
                };
                match serde_json::to_value(result) {
                    Ok(value) => result_response(id, value),
                    Err(_) => error_response(id, CODE_SERIALIZATION, "serialization failed"),
                }
            }
            Err(HandlerError::InvalidArguments(message)) => {
                error_response(id, CODE_INVALID_PARAMS, message)
            }
            Err(HandlerError::Upstream(message)) => error_response(id, CODE_UPSTREAM, message),
            Err(HandlerError::Internal(message)) => error_response(id, CODE_INTERNAL, message),
        }
    }
}

#[async_trait]
impl Endpoint for Dispatcher {
    async fn dispatch(&self, call: CallContext, request: JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => Self::handle_initialize(request.id),
            "ping" | "notifications/initialized" => result_response(request.id, json!({})),
            "tools/list" => self.handle_tools_list(request.id),
            "tools/call" => self.handle_tools_call(&call, request.id, request.params).await,
            _ => error_response(request.id, CODE_METHOD_NOT_FOUND, "method not found"),
        }
    }
}

// ============================================================================
// SECTION: MCP Server
// ============================================================================

/// MCP server instance.
pub struct McpServer {
    /// Server configuration.
    config: TeamworkMcpConfig,
    /// Composed request pipeline.
    pipeline: Arc<Pipeline>,
}

impl McpServer {
    /// Builds a server from configuration, toolsets, and the method registry.
    ///
    /// Applies the configured enable list to every toolset (reporting every
    /// invalid token in one joined error), builds the tool table, and
    /// composes the middleware pipeline. Any failure here aborts startup;
    /// there is no partial server.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when configuration validation, toolset
    /// enablement, or table construction fails.
    pub fn from_config(
        config: TeamworkMcpConfig,
        toolsets: Vec<Toolset>,
        registry: &MethodRegistry,
    ) -> Result<Self, McpServerError> {
        config.validate().map_err(|err| McpServerError::Config(err.to_string()))?;
        let enable_list =
            config.enable_list().map_err(|err| McpServerError::Config(err.to_string()))?;
        let mut group = ToolsetGroup::new(config.server.read_only);
        for toolset in toolsets {
            group.add_toolset(toolset);
        }
        group
            .enable(registry, &enable_list)
            .map_err(|err| McpServerError::Config(err.to_string()))?;
        let mut table = ToolTable::default();
        group.register_all(&mut table);
        if !table.duplicates().is_empty() {
            return Err(McpServerError::Init(format!(
                "duplicate tool registrations: {}",
                table.duplicates().join(", ")
            )));
        }
        emit_startup_warnings(&config, &group);
        let verifier = Arc::new(StaticTokenVerifier::from_config(config.server.auth.as_ref()));
        let gate = Arc::new(AuthGate::new(verifier, Arc::new(StderrAuditSink)));
        let filter = Arc::new(ScopeFilter::from_group(&group));
        let middlewares: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(AuthGateMiddleware::new(gate)),
            Arc::new(ScopeFilterMiddleware::new(filter)),
        ];
        let pipeline = Arc::new(Pipeline::new(middlewares, Arc::new(Dispatcher::new(table))));
        Ok(Self {
            config,
            pipeline,
        })
    }

    /// Runs one raw payload through parsing and the pipeline.
    pub async fn handle(&self, context: RequestContext, bytes: &[u8]) -> JsonRpcResponse {
        handle_payload(&self.pipeline, context, bytes, self.config.server.max_body_bytes).await
    }

    /// Serves requests using the configured transport.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when the transport fails.
    pub async fn serve(self) -> Result<(), McpServerError> {
        match self.config.server.transport {
            ServerTransport::Stdio => serve_stdio(self).await,
            ServerTransport::Http => serve_http(self).await,
        }
    }
}

/// Parses and runs one raw JSON-RPC payload.
async fn handle_payload(
    pipeline: &Pipeline,
    context: RequestContext,
    bytes: &[u8],
    max_body_bytes: usize,
) -> JsonRpcResponse {
    if bytes.len() > max_body_bytes {
        return error_response(Value::Null, CODE_PAYLOAD_TOO_LARGE, "request body too large");
    }
    let Ok(request) = serde_json::from_slice::<JsonRpcRequest>(bytes) else {
        return error_response(Value::Null, CODE_INVALID_REQUEST, "invalid json-rpc request");
    };
    if request.jsonrpc != JSONRPC_VERSION {
        return error_response(request.id, CODE_INVALID_REQUEST, "invalid json-rpc version");
    }
    let context = context.with_request_id(request.id.to_string());
    pipeline.handle(context, request).await
}

/// Emits startup warnings for risky configurations.
#[allow(clippy::print_stderr, reason = "Startup warnings go to the operator log on stderr.")]
fn emit_startup_warnings(config: &TeamworkMcpConfig, group: &ToolsetGroup) {
    if config.server.auth.is_none() {
        eprintln!(
            "teamwork-mcp: WARNING: no auth tokens configured; only bypass methods will be \
             callable"
        );
    }
    if !group.has_tools() {
        eprintln!("teamwork-mcp: WARNING: no tools enabled; tools/list will be empty");
    }
}

// ============================================================================
// SECTION: Stdio Transport
// ============================================================================

/// Serves JSON-RPC requests over stdin/stdout with Content-Length framing.
async fn serve_stdio(server: McpServer) -> Result<(), McpServerError> {
    let handle = tokio::runtime::Handle::current();
    let auth_header =
        std::env::var(STDIO_TOKEN_ENV_VAR).ok().map(|token| format!("Bearer {token}"));
    tokio::task::spawn_blocking(move || -> Result<(), McpServerError> {
        let mut reader = BufReader::new(std::io::stdin());
        let mut writer = std::io::stdout();
        loop {
            let Some(bytes) = read_framed(&mut reader, server.config.server.max_body_bytes)?
            else {
                return Ok(());
            };
            let context = RequestContext::stdio(auth_header.clone());
            let response = handle.block_on(server.handle(context, &bytes));
            let payload = serde_json::to_vec(&response).map_err(|_| {
                McpServerError::Transport("json-rpc serialization failed".to_string())
            })?;
            write_framed(&mut writer, &payload)?;
        }
    })
    .await
    .map_err(|_| McpServerError::Transport("stdio worker failed".to_string()))?
}

/// Reads a framed stdio payload using MCP Content-Length headers.
///
/// Returns `Ok(None)` on a clean end of stream before any header bytes.
fn read_framed(
    reader: &mut BufReader<impl Read>,
    max_body_bytes: usize,
) -> Result<Option<Vec<u8>>, McpServerError> {
    let mut content_length: Option<usize> = None;
    let mut line = String::new();
    loop {
        line.clear();
        let bytes = reader
            .read_line(&mut line)
            .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
        if bytes == 0 {
            if content_length.is_none() {
                return Ok(None);
            }
            return Err(McpServerError::Transport("stdio closed mid-frame".to_string()));
        }
        if line.trim().is_empty() {
            break;
        }
        if let Some(value) = line.strip_prefix("Content-Length:") {
            let parsed = value
                .trim()
                .parse::<usize>()
                .map_err(|_| McpServerError::Transport("invalid content length".to_string()))?;
            content_length = Some(parsed);
        }
    }
    let len = content_length
        .ok_or_else(|| McpServerError::Transport("missing content length".to_string()))?;
    if len > max_body_bytes {
        return Err(McpServerError::Transport("payload too large".to_string()));
    }
    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
    Ok(Some(buf))
}

/// Writes a framed stdio payload using MCP Content-Length headers.
fn write_framed(writer: &mut impl Write, payload: &[u8]) -> Result<(), McpServerError> {
    let header = format!("Content-Length: {}\r\n\r\n", payload.len());
    writer
        .write_all(header.as_bytes())
        .map_err(|_| McpServerError::Transport("stdio write failed".to_string()))?;
    writer
        .write_all(payload)
        .map_err(|_| McpServerError::Transport("stdio write failed".to_string()))?;
    writer.flush().map_err(|_| McpServerError::Transport("stdio write failed".to_string()))
}

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// Shared server state for HTTP handlers.
struct HttpState {
    /// Server owning the pipeline and configuration.
    server: McpServer,
}

/// Serves JSON-RPC requests over HTTP.
async fn serve_http(server: McpServer) -> Result<(), McpServerError> {
    let bind = server
        .config
        .server
        .bind
        .clone()
        .ok_or_else(|| McpServerError::Config("bind address required".to_string()))?;
    let addr: SocketAddr =
        bind.parse().map_err(|_| McpServerError::Config("invalid bind address".to_string()))?;
    let state = Arc::new(HttpState {
        server,
    });
    let app = Router::new().route("/rpc", post(handle_http)).with_state(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|_| McpServerError::Transport("http bind failed".to_string()))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(|_| McpServerError::Transport("http server failed".to_string()))
}

/// Handles HTTP JSON-RPC requests.
async fn handle_http(
    State(state): State<Arc<HttpState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    bytes: Bytes,
) -> impl IntoResponse {
    let auth_header =
        headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()).map(str::to_string);
    let context = RequestContext::http(Some(peer.ip()), auth_header);
    let response = state.server.handle(context, bytes.as_ref()).await;
    (http_status(&response), axum::Json(response))
}

/// Maps a JSON-RPC response to an HTTP status code.
fn http_status(response: &JsonRpcResponse) -> StatusCode {
    match response.error.as_ref().map(|error| error.code) {
        Some(CODE_UNAUTHENTICATED) => StatusCode::UNAUTHORIZED,
        Some(CODE_FORBIDDEN) => StatusCode::FORBIDDEN,
        Some(
            CODE_INVALID_REQUEST | CODE_METHOD_NOT_FOUND | CODE_INVALID_PARAMS,
        ) => StatusCode::BAD_REQUEST,
        Some(CODE_PAYLOAD_TOO_LARGE) => StatusCode::PAYLOAD_TOO_LARGE,
        Some(_) | None => StatusCode::OK,
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// MCP server errors.
#[derive(Debug, thiserror::Error)]
pub enum McpServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        reason = "Test-only framing assertions."
    )]

    use std::io::BufReader;
    use std::io::Cursor;

    use super::read_framed;
    use super::write_framed;

    #[test]
    fn read_framed_rejects_payload_over_limit() {
        let payload = br#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#;
        let framed = format!(
            "Content-Length: {}\r\n\r\n{}",
            payload.len(),
            String::from_utf8_lossy(payload)
        );
        let mut reader = BufReader::new(Cursor::new(framed.into_bytes()));
        let result = read_framed(&mut reader, payload.len() - 1);
        assert!(result.is_err());
    }

    #[test]
    fn read_framed_accepts_payload_at_limit() {
        let payload = br#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#;
        let framed = format!(
            "Content-Length: {}\r\n\r\n{}",
            payload.len(),
            String::from_utf8_lossy(payload)
        );
        let mut reader = BufReader::new(Cursor::new(framed.into_bytes()));
        let bytes = read_framed(&mut reader, payload.len())
            .expect("payload read")
            .expect("frame present");
        assert_eq!(bytes, payload);
    }

    #[test]
    fn read_framed_returns_none_on_clean_eof() {
        let mut reader = BufReader::new(Cursor::new(Vec::new()));
        let result = read_framed(&mut reader, 1024).expect("clean eof");
        assert!(result.is_none());
    }

    #[test]
    fn write_framed_emits_content_length_header() {
        let mut out = Vec::new();
        write_framed(&mut out, br#"{"jsonrpc":"2.0"}"#).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Content-Length: 17\r\n\r\n"));
    }

    #[test]
    fn read_framed_requires_content_length() {
        let mut reader = BufReader::new(Cursor::new(b"\r\n".to_vec()));
        assert!(read_framed(&mut reader, 1024).is_err());
    }
}
