// crates/teamwork-mcp-core/src/lib.rs
// ============================================================================
// Module: Teamwork MCP Core
// Description: Toolset model for the Teamwork MCP server.
// Purpose: Provide method identifiers, the method registry, and toolsets.
// Dependencies: serde, serde_json, thiserror, async-trait, url
// ============================================================================

//! ## Overview
//! This crate defines the protocol-independent toolset model: validated
//! method identifiers, the process-wide method registry, read/write tool
//! wrappers, enableable toolsets, and the toolset group that computes the
//! exposed tool surface. The registry and group are built single-threaded at
//! startup and treated as read-only afterwards; no synchronization is needed
//! because no writer exists post-init.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod group;
pub mod handler;
pub mod method;
pub mod registry;
pub mod toolset;

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

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use group::GroupEnableError;
pub use group::ToolSink;
pub use group::ToolsetGroup;
pub use handler::AuthClaims;
pub use handler::HandlerError;
pub use handler::ToolHandler;
pub use method::METHOD_ALL;
pub use method::Method;
pub use method::MethodError;
pub use registry::MethodRegistry;
pub use registry::RegistryError;
pub use toolset::EnableError;
pub use toolset::ToolAnnotations;
pub use toolset::ToolDefinition;
pub use toolset::ToolKind;
pub use toolset::ToolWrapper;
pub use toolset::Toolset;
