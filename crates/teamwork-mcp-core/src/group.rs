// crates/teamwork-mcp-core/src/group.rs
// ============================================================================
// Module: Toolset Group
// Description: Aggregate of toolsets with a global read-only override.
// Purpose: Compute the process-wide tool exposure set in one place.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! The toolset group composes every toolset, applies the global read-only
//! flag, and is the single point where the computed exposure set becomes
//! visible to the transport layer through [`ToolSink`]. Enable errors from
//! contained toolsets are aggregated, never short-circuited, so callers learn
//! about every invalid method in one report.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::registry::MethodRegistry;
use crate::toolset::EnableError;
use crate::toolset::ToolWrapper;
use crate::toolset::Toolset;

// ============================================================================
// SECTION: Tool Sink
// ============================================================================

/// Sink receiving the exposed tool surface at server construction time.
pub trait ToolSink {
    /// Adds one exposed tool to the transport layer's tool table.
    fn add_tool(&mut self, tool: ToolWrapper);
}

// ============================================================================
// SECTION: Toolset Group
// ============================================================================

/// Aggregate of toolsets with a global read-only override.
///
/// # Invariants
/// - When `read_only` is set, no write tool is ever exposed regardless of its
///   enablement state.
#[derive(Debug, Clone)]
pub struct ToolsetGroup {
    /// Global read-only veto over write tools.
    read_only: bool,
    /// Contained toolsets in registration order.
    toolsets: Vec<Toolset>,
}

impl ToolsetGroup {
    /// Creates an empty group.
    #[must_use]
    pub const fn new(read_only: bool) -> Self {
        Self {
            read_only,
            toolsets: Vec::new(),
        }
    }

    /// Returns whether the global read-only veto is active.
    #[must_use]
    pub const fn read_only(&self) -> bool {
        self.read_only
    }

    /// Adds a toolset to the group.
    ///
    /// Name collisions are a caller error detected downstream by duplicate
    /// tool registrations; no uniqueness constraint is enforced here.
    pub fn add_toolset(&mut self, toolset: Toolset) {
        self.toolsets.push(toolset);
    }

    /// Returns the contained toolsets.
    #[must_use]
    pub fn toolsets(&self) -> &[Toolset] {
        &self.toolsets
    }

    /// Applies an enable list to every contained toolset.
    ///
    /// # Errors
    ///
    /// Returns [`GroupEnableError`] aggregating every toolset rejection.
    pub fn enable(
        &mut self,
        registry: &MethodRegistry,
        requested: &[String],
    ) -> Result<(), GroupEnableError> {
        let mut errors = Vec::new();
        for toolset in &mut self.toolsets {
            if let Err(err) = toolset.enable(registry, requested) {
                errors.push(err);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(GroupEnableError {
                errors,
            })
        }
    }

    /// Returns true when any toolset has an enabled, exposable tool under the
    /// group's read-only flag.
    #[must_use]
    pub fn has_tools(&self) -> bool {
        self.toolsets.iter().any(|toolset| !toolset.exposable_tools(self.read_only).is_empty())
    }

    /// Pushes every exposable tool into the transport layer's tool table.
    pub fn register_all(&self, sink: &mut dyn ToolSink) {
        for toolset in &self.toolsets {
            for tool in toolset.exposable_tools(self.read_only) {
                sink.add_tool(tool.clone());
            }
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Aggregated enablement failure across a group's toolsets.
#[derive(Debug, Error)]
#[error("toolset enablement failed: {}", errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
pub struct GroupEnableError {
    /// Every per-toolset rejection, in registration order.
    pub errors: Vec<EnableError>,
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions use unwrap for clarity.")]

    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::Value;
    use serde_json::json;

    use super::ToolSink;
    use super::ToolsetGroup;
    use crate::handler::AuthClaims;
    use crate::handler::HandlerError;
    use crate::handler::ToolHandler;
    use crate::method::Method;
    use crate::registry::MethodRegistry;
    use crate::toolset::ToolAnnotations;
    use crate::toolset::ToolDefinition;
    use crate::toolset::ToolKind;
    use crate::toolset::ToolWrapper;
    use crate::toolset::Toolset;

    /// Handler stub that echoes its arguments.
    struct EchoHandler;

    #[async_trait]
    impl ToolHandler for EchoHandler {
        async fn call(&self, args: Value, _claims: &AuthClaims) -> Result<Value, HandlerError> {
            Ok(args)
        }
    }

    /// Sink collecting registered method names.
    #[derive(Default)]
    struct CollectingSink {
        /// Registered method names in arrival order.
        names: Vec<String>,
    }

    impl ToolSink for CollectingSink {
        fn add_tool(&mut self, tool: ToolWrapper) {
            self.names.push(tool.method().as_str().to_string());
        }
    }

    fn tool(name: &str, kind: ToolKind) -> ToolWrapper {
        let definition = ToolDefinition {
            name: Method::parse(name).unwrap(),
            description: format!("test tool {name}"),
            input_schema: json!({"type": "object"}),
            annotations: ToolAnnotations {
                title: None,
                read_only_hint: !kind.is_write(),
            },
        };
        ToolWrapper::new(kind, definition, Arc::new(EchoHandler))
    }

    fn group(read_only: bool) -> (ToolsetGroup, MethodRegistry) {
        let mut registry = MethodRegistry::new();
        registry.register("twprojects-get_task").unwrap();
        registry.register("twprojects-create_task").unwrap();
        registry.register("twdesk-get_ticket").unwrap();
        let mut projects = Toolset::new("projects", "twprojects", "Teamwork Projects tools");
        projects.add_read_tools([tool("twprojects-get_task", ToolKind::Read)]);
        projects.add_write_tools([tool("twprojects-create_task", ToolKind::Write)]);
        let mut desk = Toolset::new("desk", "twdesk", "Teamwork Desk tools");
        desk.add_read_tools([tool("twdesk-get_ticket", ToolKind::Read)]);
        let mut group = ToolsetGroup::new(read_only);
        group.add_toolset(projects);
        group.add_toolset(desk);
        (group, registry)
    }

    #[test]
    fn enable_aggregates_errors_across_toolsets() {
        let (mut group, registry) = group(false);
        let err = group.enable(&registry, &["bogus-method".to_string()]).unwrap_err();
        assert_eq!(err.errors.len(), 2);
        let message = err.to_string();
        assert!(message.contains("projects"));
        assert!(message.contains("desk"));
        assert!(message.contains("bogus-method"));
    }

    #[test]
    fn has_tools_is_false_with_empty_enablement() {
        let (group, _registry) = group(false);
        assert!(!group.has_tools());
    }

    #[test]
    fn has_tools_honors_read_only_veto() {
        let (mut group, registry) = group(true);
        group.enable(&registry, &["twprojects-create_task".to_string()]).unwrap();
        assert!(!group.has_tools());
    }

    #[test]
    fn register_all_preserves_registration_order() {
        let (mut group, registry) = group(false);
        group.enable(&registry, &["all".to_string()]).unwrap();
        let mut sink = CollectingSink::default();
        group.register_all(&mut sink);
        assert_eq!(
            sink.names,
            vec!["twprojects-get_task", "twprojects-create_task", "twdesk-get_ticket"]
        );
    }

    #[test]
    fn register_all_omits_write_tools_when_read_only() {
        let (mut group, registry) = group(true);
        group.enable(&registry, &["all".to_string()]).unwrap();
        let mut sink = CollectingSink::default();
        group.register_all(&mut sink);
        assert_eq!(sink.names, vec!["twprojects-get_task", "twdesk-get_ticket"]);
    }
}
