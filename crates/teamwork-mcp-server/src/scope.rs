// crates/teamwork-mcp-server/src/scope.rs
// ============================================================================
// Module: Scope Filter
// Description: Scope-based pruning of tool listing responses.
// Purpose: Advertise only the toolsets the caller's granted scopes permit.
// Dependencies: teamwork-mcp-core
// ============================================================================

//! ## Overview
//! The scope filter applies only to tool-listing responses; individual tool
//! invocations are separately gated by whether the tool is exposed at all.
//! Tools are classified by the method-name prefix convention
//! (`twprojects-*` belongs to toolset `projects`). Empty scopes mean "no
//! restriction", mirroring unauthenticated bypass behavior; callers depend on
//! this and it must be preserved exactly. Tools with an unrecognized prefix
//! are never dropped, so a naming mismatch cannot hide legitimate tools.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use teamwork_mcp_core::ToolDefinition;
use teamwork_mcp_core::ToolsetGroup;

// ============================================================================
// SECTION: Scope Filter
// ============================================================================

/// Response middleware state pruning tool listings by caller scopes.
///
/// # Invariants
/// - The prefix table is derived from the constructed toolset group at
///   startup and immutable afterwards.
#[derive(Debug, Clone, Default)]
pub struct ScopeFilter {
    /// Scope name keyed by owning method prefix.
    prefixes: BTreeMap<String, String>,
}

impl ScopeFilter {
    /// Derives the prefix-to-scope table from a toolset group.
    #[must_use]
    pub fn from_group(group: &ToolsetGroup) -> Self {
        let mut prefixes = BTreeMap::new();
        for toolset in group.toolsets() {
            prefixes.insert(toolset.prefix().to_string(), toolset.name().to_string());
        }
        Self {
            prefixes,
        }
    }

    /// Prunes a tool listing in place, preserving the relative order of
    /// surviving entries.
    pub fn filter(&self, tools: &mut Vec<ToolDefinition>, scopes: &[String]) {
        if scopes.is_empty() {
            return;
        }
        tools.retain(|tool| {
            self.prefixes
                .get(tool.name.prefix())
                .is_none_or(|scope| scopes.iter().any(|granted| granted == scope))
        });
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions use unwrap for clarity.")]

    use serde_json::json;
    use teamwork_mcp_core::Method;
    use teamwork_mcp_core::ToolAnnotations;
    use teamwork_mcp_core::ToolDefinition;
    use teamwork_mcp_core::Toolset;
    use teamwork_mcp_core::ToolsetGroup;

    use super::ScopeFilter;

    fn definition(name: &str) -> ToolDefinition {
        ToolDefinition {
            name: Method::parse(name).unwrap(),
            description: format!("test tool {name}"),
            input_schema: json!({"type": "object"}),
            annotations: ToolAnnotations {
                title: None,
                read_only_hint: true,
            },
        }
    }

    fn filter() -> ScopeFilter {
        let mut group = ToolsetGroup::new(false);
        group.add_toolset(Toolset::new("projects", "twprojects", "Teamwork Projects tools"));
        group.add_toolset(Toolset::new("desk", "twdesk", "Teamwork Desk tools"));
        ScopeFilter::from_group(&group)
    }

    fn names(tools: &[ToolDefinition]) -> Vec<&str> {
        tools.iter().map(|tool| tool.name.as_str()).collect()
    }

    #[test]
    fn single_scope_keeps_matching_toolset_only() {
        let mut tools = vec![definition("twprojects-x_y"), definition("twdesk-y_z")];
        filter().filter(&mut tools, &["projects".to_string()]);
        assert_eq!(names(&tools), vec!["twprojects-x_y"]);
    }

    #[test]
    fn empty_scopes_leave_listing_unchanged() {
        let mut tools = vec![definition("twprojects-x_y"), definition("twdesk-y_z")];
        filter().filter(&mut tools, &[]);
        assert_eq!(names(&tools), vec!["twprojects-x_y", "twdesk-y_z"]);
    }

    #[test]
    fn both_scopes_keep_both_toolsets() {
        let mut tools = vec![definition("twprojects-x_y"), definition("twdesk-y_z")];
        filter().filter(&mut tools, &["projects".to_string(), "desk".to_string()]);
        assert_eq!(names(&tools), vec!["twprojects-x_y", "twdesk-y_z"]);
    }

    #[test]
    fn unknown_prefix_is_never_dropped() {
        let mut tools = vec![definition("twunknown-x_y"), definition("twdesk-y_z")];
        filter().filter(&mut tools, &["projects".to_string()]);
        assert_eq!(names(&tools), vec!["twunknown-x_y"]);
    }

    #[test]
    fn relative_order_is_preserved() {
        let mut tools = vec![
            definition("twdesk-a_b"),
            definition("twprojects-c_d"),
            definition("twdesk-e_f"),
        ];
        filter().filter(&mut tools, &["desk".to_string()]);
        assert_eq!(names(&tools), vec!["twdesk-a_b", "twdesk-e_f"]);
    }
}
