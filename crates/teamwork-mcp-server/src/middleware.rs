// crates/teamwork-mcp-server/src/middleware.rs
// ============================================================================
// Module: Middleware Pipeline
// Description: Ordered interceptor chain around JSON-RPC dispatch.
// Purpose: Compose the authentication gate and scope filter explicitly.
// Dependencies: teamwork-mcp-core, async-trait
// ============================================================================

//! ## Overview
//! Request handling is an explicit ordered list of middleware with a fixed
//! `(call, request, next)` signature, composed at server-construction time
//! around a dispatch endpoint. The authentication gate sits at the front and
//! attaches the resolved [`AuthContext`] to the call; the scope filter sits
//! behind dispatch and prunes tool-listing results. Per-request state flows
//! through [`CallContext`] and is never shared across concurrent calls.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::AuthContext;
use crate::auth::AuthError;
use crate::auth::AuthGate;
use crate::auth::RequestContext;
use crate::rpc::CODE_FORBIDDEN;
use crate::rpc::CODE_SERIALIZATION;
use crate::rpc::CODE_UNAUTHENTICATED;
use crate::rpc::JsonRpcRequest;
use crate::rpc::JsonRpcResponse;
use crate::rpc::ToolListResult;
use crate::rpc::error_response;
use crate::scope::ScopeFilter;

// ============================================================================
// SECTION: Call Context
// ============================================================================

/// Per-request state threaded through the middleware chain.
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Transport-level request context.
    pub request: RequestContext,
    /// Resolved caller identity; anonymous until the gate runs.
    pub auth: AuthContext,
}

impl CallContext {
    /// Builds a call context with an anonymous identity.
    #[must_use]
    pub const fn new(request: RequestContext) -> Self {
        Self {
            request,
            auth: AuthContext::anonymous(),
        }
    }
}

// ============================================================================
// SECTION: Chain Traits
// ============================================================================

/// One interceptor in the request chain.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Handles a request, delegating to `next` to continue the chain.
    async fn handle(
        &self,
        call: CallContext,
        request: JsonRpcRequest,
        next: Next<'_>,
    ) -> JsonRpcResponse;
}

/// Terminal dispatch target of the chain.
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// Dispatches a request that passed every middleware.
    async fn dispatch(&self, call: CallContext, request: JsonRpcRequest) -> JsonRpcResponse;
}

/// Remainder of the chain after the current middleware.
pub struct Next<'a> {
    /// Middlewares still to run, in order.
    rest: &'a [Arc<dyn Middleware>],
    /// Terminal dispatch endpoint.
    endpoint: &'a dyn Endpoint,
}

impl<'a> Next<'a> {
    /// Runs the remainder of the chain.
    pub fn run(
        self,
        call: CallContext,
        request: JsonRpcRequest,
    ) -> Pin<Box<dyn Future<Output = JsonRpcResponse> + Send + 'a>> {
        Box::pin(async move {
            match self.rest.split_first() {
                Some((middleware, rest)) => {
                    let next = Next {
                        rest,
                        endpoint: self.endpoint,
                    };
                    middleware.handle(call, request, next).await
                }
                None => self.endpoint.dispatch(call, request).await,
            }
        })
    }
}

/// Composed middleware chain around a dispatch endpoint.
pub struct Pipeline {
    /// Ordered middlewares, front of chain first.
    middlewares: Vec<Arc<dyn Middleware>>,
    /// Terminal dispatch endpoint.
    endpoint: Arc<dyn Endpoint>,
}

impl Pipeline {
    /// Composes a chain at server-construction time.
    #[must_use]
    pub fn new(middlewares: Vec<Arc<dyn Middleware>>, endpoint: Arc<dyn Endpoint>) -> Self {
        Self {
            middlewares,
            endpoint,
        }
    }

    /// Runs one request through the full chain.
    pub async fn handle(
        &self,
        context: RequestContext,
        request: JsonRpcRequest,
    ) -> JsonRpcResponse {
        let next = Next {
            rest: &self.middlewares,
            endpoint: self.endpoint.as_ref(),
        };
        next.run(CallContext::new(context), request).await
    }
}

// ============================================================================
// SECTION: Auth Gate Middleware
// ============================================================================

/// Front-of-chain middleware enforcing the authentication gate.
pub struct AuthGateMiddleware {
    /// Gate shared with the rest of the server.
    gate: Arc<AuthGate>,
}

impl AuthGateMiddleware {
    /// Creates the middleware over a gate.
    #[must_use]
    pub fn new(gate: Arc<AuthGate>) -> Self {
        Self {
            gate,
        }
    }
}

#[async_trait]
impl Middleware for AuthGateMiddleware {
    async fn handle(
        &self,
        mut call: CallContext,
        request: JsonRpcRequest,
        next: Next<'_>,
    ) -> JsonRpcResponse {
        match self.gate.gate(&call.request, &request.method).await {
            Ok(auth) => {
                call.auth = auth;
                next.run(call, request).await
            }
            Err(err) => {
                let code = match err {
                    AuthError::Unauthenticated(_) => CODE_UNAUTHENTICATED,
                    AuthError::Unauthorized(_) => CODE_FORBIDDEN,
                };
                error_response(request.id, code, err.to_string())
            }
        }
    }
}

// ============================================================================
// SECTION: Scope Filter Middleware
// ============================================================================

/// Back-of-chain middleware pruning tool-listing responses by scope.
pub struct ScopeFilterMiddleware {
    /// Filter derived from the toolset group at startup.
    filter: Arc<ScopeFilter>,
}

impl ScopeFilterMiddleware {
    /// Creates the middleware over a scope filter.
    #[must_use]
    pub fn new(filter: Arc<ScopeFilter>) -> Self {
        Self {
            filter,
        }
    }
}

#[async_trait]
impl Middleware for ScopeFilterMiddleware {
    async fn handle(
        &self,
        call: CallContext,
        request: JsonRpcRequest,
        next: Next<'_>,
    ) -> JsonRpcResponse {
        let is_listing = request.method == "tools/list";
        let scopes = call.auth.claims.scopes.clone();
        let mut response = next.run(call, request).await;
        if !is_listing || scopes.is_empty() || response.error.is_some() {
            return response;
        }
        let Some(result) = response.result.take() else {
            return response;
        };
        match serde_json::from_value::<ToolListResult>(result.clone()) {
            Ok(mut listing) => {
                self.filter.filter(&mut listing.tools, &scopes);
                match serde_json::to_value(listing) {
                    Ok(filtered) => {
                        response.result = Some(filtered);
                        response
                    }
                    Err(_) => {
                        error_response(response.id, CODE_SERIALIZATION, "serialization failed")
                    }
                }
            }
            // Unexpected result shape: pass through unchanged (fail open for
            // listings this filter does not recognize).
            Err(_) => {
                response.result = Some(result);
                response
            }
        }
    }
}
