// crates/teamwork-mcp-server/src/auth.rs
// ============================================================================
// Module: Authentication Gate
// Description: Request authentication and audit for Teamwork MCP calls.
// Purpose: Provide strict, fail-closed credential gating for inbound requests.
// Dependencies: teamwork-mcp-core, async-trait, serde, sha2, url
// ============================================================================

//! ## Overview
//! Every inbound request passes the authentication gate before dispatch. A
//! fixed bypass list keeps the initialization handshake callable without a
//! credential; every other method requires a bearer token that resolves to a
//! verified caller identity. Verification failures of any kind are terminal
//! for the request and surface as "unauthenticated" without leaking verifier
//! internals. All decisions emit audit events.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use teamwork_mcp_core::AuthClaims;
use thiserror::Error;
use url::Url;

use crate::config::ServerAuthConfig;
use crate::config::ServerTransport;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted Authorization header size in bytes.
const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;

/// Methods callable without prior authentication.
///
/// Fixed and hard-coded: widening this list is a security-relevant change.
pub const BYPASS_METHODS: &[&str] = &["initialize", "ping", "notifications/initialized"];

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Per-request context used for auth decisions.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Transport used by the caller.
    pub transport: ServerTransport,
    /// Peer IP address when available.
    pub peer_ip: Option<IpAddr>,
    /// Authorization header value (HTTP).
    pub auth_header: Option<String>,
    /// Optional request identifier for auditing.
    pub request_id: Option<String>,
}

impl RequestContext {
    /// Builds a stdio request context.
    #[must_use]
    pub fn stdio(auth_header: Option<String>) -> Self {
        Self {
            transport: ServerTransport::Stdio,
            peer_ip: None,
            auth_header,
            request_id: None,
        }
    }

    /// Builds an HTTP request context.
    #[must_use]
    pub const fn http(peer_ip: Option<IpAddr>, auth_header: Option<String>) -> Self {
        Self {
            transport: ServerTransport::Http,
            peer_ip,
            auth_header,
            request_id: None,
        }
    }

    /// Returns a copy with the request identifier set.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

// ============================================================================
// SECTION: Auth Context
// ============================================================================

/// Resolved caller identity for one request.
///
/// Constructed once per request and propagated immutably; never mutated
/// mid-request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Whether a credential was verified for this request.
    pub authenticated: bool,
    /// Claims propagated to handlers and the scope filter.
    pub claims: AuthClaims,
    /// Token fingerprint for bearer auth (sha256, never the raw token).
    pub token_fingerprint: Option<String>,
}

impl AuthContext {
    /// Builds an anonymous context for bypass traffic.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            authenticated: false,
            claims: AuthClaims::anonymous(),
            token_fingerprint: None,
        }
    }
}

// ============================================================================
// SECTION: Credential Verification
// ============================================================================

/// Identity resolved by credential verification.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    /// Customer installation URL the credential belongs to.
    pub customer_url: Url,
    /// Scopes granted to the credential.
    pub scopes: Vec<String>,
}

/// Credential verification errors.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The credential does not resolve to any known caller.
    #[error("unknown credential")]
    UnknownCredential,
    /// The verification collaborator failed.
    #[error("verification upstream failure: {0}")]
    Upstream(String),
}

/// Resolves bearer tokens to caller identities.
///
/// Implementations may perform network I/O; verification runs on the calling
/// request's execution context so a hung verifier never blocks unrelated
/// requests.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Verifies a bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError`] when the token is unknown or verification
    /// fails.
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, VerifyError>;
}

/// Verifier backed by statically configured tokens.
#[derive(Clone, Default)]
pub struct StaticTokenVerifier {
    /// Identities keyed by token value.
    identities: BTreeMap<String, VerifiedIdentity>,
}

impl fmt::Debug for StaticTokenVerifier {
    /// Raw token values never appear in debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenVerifier")
            .field("identities", &self.identities.len())
            .finish_non_exhaustive()
    }
}

impl StaticTokenVerifier {
    /// Builds a verifier from optional server auth configuration.
    #[must_use]
    pub fn from_config(auth: Option<&ServerAuthConfig>) -> Self {
        let mut identities = BTreeMap::new();
        if let Some(auth) = auth {
            for token in &auth.tokens {
                identities.insert(token.token.clone(), VerifiedIdentity {
                    customer_url: token.customer_url.clone(),
                    scopes: token.scopes.clone(),
                });
            }
        }
        Self {
            identities,
        }
    }
}

#[async_trait]
impl CredentialVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, VerifyError> {
        self.identities.get(token).cloned().ok_or(VerifyError::UnknownCredential)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Authentication or authorization errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or invalid authentication.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    /// Caller is authenticated but not authorized.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

// ============================================================================
// SECTION: Authentication Gate
// ============================================================================

/// Request middleware state gating every inbound call.
pub struct AuthGate {
    /// Credential verification collaborator.
    verifier: Arc<dyn CredentialVerifier>,
    /// Audit sink for gate decisions.
    audit: Arc<dyn AuthAuditSink>,
}

impl AuthGate {
    /// Creates a gate over a verifier and audit sink.
    #[must_use]
    pub fn new(verifier: Arc<dyn CredentialVerifier>, audit: Arc<dyn AuthAuditSink>) -> Self {
        Self {
            verifier,
            audit,
        }
    }

    /// Returns whether the method is callable without authentication.
    #[must_use]
    pub fn is_bypass(method: &str) -> bool {
        BYPASS_METHODS.contains(&method)
    }

    /// Gates one request.
    ///
    /// Bypass methods short-circuit to an anonymous context without
    /// establishing a verified identity. Ambiguous verification outcomes are
    /// treated as unauthenticated, never as authenticated.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when the request presents no credential or the
    /// credential fails verification.
    pub async fn gate(
        &self,
        context: &RequestContext,
        method: &str,
    ) -> Result<AuthContext, AuthError> {
        if Self::is_bypass(method) {
            let auth = AuthContext::anonymous();
            self.audit.record(&AuthAuditEvent::allowed(context, method, &auth));
            return Ok(auth);
        }
        match self.verify_credential(context).await {
            Ok(auth) => {
                self.audit.record(&AuthAuditEvent::allowed(context, method, &auth));
                Ok(auth)
            }
            Err(err) => {
                self.audit.record(&AuthAuditEvent::denied(context, method, &err));
                Err(err)
            }
        }
    }

    /// Verifies the presented credential, failing closed on any ambiguity.
    async fn verify_credential(&self, context: &RequestContext) -> Result<AuthContext, AuthError> {
        let token = parse_bearer_token(context.auth_header.as_deref())?;
        match self.verifier.verify(&token).await {
            Ok(identity) => Ok(AuthContext {
                authenticated: true,
                claims: AuthClaims {
                    customer_url: Some(identity.customer_url),
                    scopes: identity.scopes,
                },
                token_fingerprint: Some(token_fingerprint(&token)),
            }),
            Err(VerifyError::UnknownCredential) => {
                Err(AuthError::Unauthenticated("invalid bearer token".to_string()))
            }
            // Upstream failures must not leak verifier internals to callers.
            Err(VerifyError::Upstream(_)) => {
                Err(AuthError::Unauthenticated("credential verification failed".to_string()))
            }
        }
    }
}

/// Extracts a bearer token from an Authorization header value.
fn parse_bearer_token(auth_header: Option<&str>) -> Result<String, AuthError> {
    let header = auth_header
        .ok_or_else(|| AuthError::Unauthenticated("missing authorization".to_string()))?;
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(AuthError::Unauthenticated("authorization header too large".to_string()));
    }
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::Unauthenticated("invalid authorization header".to_string()));
    }
    Ok(token.to_string())
}

/// Computes a sha256 hex fingerprint for a bearer token.
fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

// ============================================================================
// SECTION: Audit Events
// ============================================================================

/// Auth audit event payload.
#[derive(Debug, Serialize)]
pub struct AuthAuditEvent {
    /// Event identifier.
    event: &'static str,
    /// Decision outcome.
    decision: &'static str,
    /// Requested method name.
    method: String,
    /// Transport label.
    transport: &'static str,
    /// Caller IP address (if available).
    peer_ip: Option<String>,
    /// Verified customer URL (for allow events).
    customer_url: Option<String>,
    /// Bearer token fingerprint (sha256).
    token_fingerprint: Option<String>,
    /// Failure reason (for deny events).
    reason: Option<String>,
    /// Request identifier (if provided).
    request_id: Option<String>,
}

impl AuthAuditEvent {
    /// Builds an allow event.
    #[must_use]
    pub fn allowed(context: &RequestContext, method: &str, auth: &AuthContext) -> Self {
        Self {
            event: "mcp_auth_gate",
            decision: "allow",
            method: method.to_string(),
            transport: transport_label(context.transport),
            peer_ip: context.peer_ip.map(|ip| ip.to_string()),
            customer_url: auth.claims.customer_url.as_ref().map(Url::to_string),
            token_fingerprint: auth.token_fingerprint.clone(),
            reason: None,
            request_id: context.request_id.clone(),
        }
    }

    /// Builds a deny event.
    #[must_use]
    pub fn denied(context: &RequestContext, method: &str, error: &AuthError) -> Self {
        Self {
            event: "mcp_auth_gate",
            decision: "deny",
            method: method.to_string(),
            transport: transport_label(context.transport),
            peer_ip: context.peer_ip.map(|ip| ip.to_string()),
            customer_url: None,
            token_fingerprint: None,
            reason: Some(error.to_string()),
            request_id: context.request_id.clone(),
        }
    }
}

/// Returns a stable transport label for audit payloads.
const fn transport_label(transport: ServerTransport) -> &'static str {
    match transport {
        ServerTransport::Stdio => "stdio",
        ServerTransport::Http => "http",
    }
}

/// Audit sink for gate decisions.
pub trait AuthAuditSink: Send + Sync {
    /// Records an auth audit event.
    fn record(&self, event: &AuthAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuthAuditSink for StderrAuditSink {
    #[allow(clippy::print_stderr, reason = "Stderr is the audit log destination.")]
    fn record(&self, event: &AuthAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            eprintln!("{payload}");
        }
    }
}

/// No-op audit sink for tests.
pub struct NoopAuditSink;

impl AuthAuditSink for NoopAuditSink {
    fn record(&self, _event: &AuthAuditEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::use_debug,
        reason = "Test-only assertions use unwrap and debug formatting for clarity."
    )]

    use url::Url;

    use super::StaticTokenVerifier;
    use super::parse_bearer_token;
    use super::token_fingerprint;
    use crate::config::ServerAuthConfig;
    use crate::config::TokenConfig;

    #[test]
    fn parse_bearer_token_accepts_case_insensitive_scheme() {
        assert_eq!(parse_bearer_token(Some("bearer tkn")).unwrap(), "tkn");
        assert_eq!(parse_bearer_token(Some("Bearer tkn")).unwrap(), "tkn");
    }

    #[test]
    fn parse_bearer_token_rejects_missing_or_malformed() {
        assert!(parse_bearer_token(None).is_err());
        assert!(parse_bearer_token(Some("Basic tkn")).is_err());
        assert!(parse_bearer_token(Some("Bearer ")).is_err());
    }

    #[test]
    fn parse_bearer_token_rejects_oversized_header() {
        let header = format!("Bearer {}", "a".repeat(9 * 1024));
        assert!(parse_bearer_token(Some(&header)).is_err());
    }

    #[test]
    fn verifier_debug_output_omits_raw_tokens() {
        let auth = ServerAuthConfig {
            tokens: vec![TokenConfig {
                token: "super-secret-token".to_string(),
                customer_url: Url::parse("https://acme.teamwork.com").unwrap(),
                scopes: vec!["projects".to_string()],
            }],
        };
        let verifier = StaticTokenVerifier::from_config(Some(&auth));
        let rendered = format!("{verifier:?}");
        assert!(!rendered.contains("super-secret-token"));
        assert!(rendered.contains("StaticTokenVerifier"));
    }

    #[test]
    fn fingerprint_is_stable_hex() {
        let fp = token_fingerprint("token-1");
        assert_eq!(fp.len(), 64);
        assert_eq!(fp, token_fingerprint("token-1"));
        assert_ne!(fp, token_fingerprint("token-2"));
    }
}
