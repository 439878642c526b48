// crates/teamwork-mcp-server/src/lib.rs
// ============================================================================
// Module: Teamwork MCP Server
// Description: MCP transport, authentication gate, and scope filtering.
// Purpose: Serve enabled Teamwork toolsets over JSON-RPC on stdio or HTTP.
// Dependencies: teamwork-mcp-core, axum, tokio, serde, sha2, thiserror
// ============================================================================

//! ## Overview
//! MCP server for the Teamwork toolset registry. Requests enter over stdio
//! or HTTP, pass through the middleware pipeline (authentication gate, then
//! dispatch, then scope filtering of tool listings), and reach handlers only
//! when the caller is authenticated. Configuration comes from a TOML file
//! with strict size and token limits.
//!
//! ## Invariants
//! - Non-bypass methods never reach dispatch without a verified identity.
//! - Upstream verifier failures deny the request; the gate fails closed.
//! - Scope filtering only ever removes tools from a listing.
//! - The tool table is immutable after startup.

pub mod auth;
pub mod config;
pub mod middleware;
pub mod rpc;
pub mod scope;
pub mod server;

pub use auth::AuthAuditEvent;
pub use auth::AuthAuditSink;
pub use auth::AuthContext;
pub use auth::AuthError;
pub use auth::AuthGate;
pub use auth::BYPASS_METHODS;
pub use auth::CredentialVerifier;
pub use auth::NoopAuditSink;
pub use auth::RequestContext;
pub use auth::StaticTokenVerifier;
pub use auth::StderrAuditSink;
pub use auth::VerifiedIdentity;
pub use auth::VerifyError;
pub use config::ConfigError;
pub use config::ServerAuthConfig;
pub use config::ServerConfig;
pub use config::ServerTransport;
pub use config::TeamworkMcpConfig;
pub use config::TokenConfig;
pub use middleware::AuthGateMiddleware;
pub use middleware::CallContext;
pub use middleware::Endpoint;
pub use middleware::Middleware;
pub use middleware::Next;
pub use middleware::Pipeline;
pub use middleware::ScopeFilterMiddleware;
pub use rpc::JsonRpcError;
pub use rpc::JsonRpcRequest;
pub use rpc::JsonRpcResponse;
pub use scope::ScopeFilter;
pub use server::Dispatcher;
pub use server::McpServer;
pub use server::McpServerError;
pub use server::ToolTable;

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions and debug output.
    #![allow(
        clippy::panic,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        clippy::dbg_macro,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        reason = "Test-only output and panic-based assertions are permitted."
    )]
}
