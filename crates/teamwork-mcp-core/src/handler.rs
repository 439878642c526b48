// crates/teamwork-mcp-core/src/handler.rs
// ============================================================================
// Module: Tool Handler Interface
// Description: Opaque invocation seam between toolsets and REST collaborators.
// Purpose: Keep business-entity handlers out of the toolset core.
// Dependencies: async-trait, serde_json, thiserror, url
// ============================================================================

//! ## Overview
//! Tool handlers are external collaborators: the toolset core consumes them
//! through [`ToolHandler`] without knowing which REST calls they make. A
//! handler receives the caller-supplied argument bag plus the request's
//! resolved [`AuthClaims`] and returns a JSON result or a typed error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Auth Claims
// ============================================================================

/// Per-request caller claims propagated to tool handlers.
///
/// # Invariants
/// - Constructed once per request from credential verification, then
///   propagated immutably for the request's duration.
#[derive(Debug, Clone, Default)]
pub struct AuthClaims {
    /// Verified customer installation URL, when authenticated.
    pub customer_url: Option<Url>,
    /// Scopes granted to the caller.
    pub scopes: Vec<String>,
}

impl AuthClaims {
    /// Builds empty claims for bypass traffic with no verified identity.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            customer_url: None,
            scopes: Vec::new(),
        }
    }
}

// ============================================================================
// SECTION: Handler Trait
// ============================================================================

/// Invocation handler for a single tool.
///
/// Handlers may perform network I/O; they run on the calling request's
/// execution context so a hung upstream never blocks unrelated requests.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Invokes the tool with the caller-supplied argument bag.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] when arguments are invalid or the upstream
    /// collaborator fails.
    async fn call(&self, args: Value, claims: &AuthClaims) -> Result<Value, HandlerError>;
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Tool handler invocation errors.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The argument bag failed handler-side validation.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    /// The upstream collaborator rejected or failed the request.
    #[error("upstream error: {0}")]
    Upstream(String),
    /// Unexpected handler failure.
    #[error("internal error: {0}")]
    Internal(String),
}
