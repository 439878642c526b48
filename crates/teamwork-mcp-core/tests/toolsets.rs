// crates/teamwork-mcp-core/tests/toolsets.rs
// ============================================================================
// Module: Toolset Model Tests
// Description: Integration tests for registry, toolset, and group behavior.
// Purpose: Validate enablement, ownership scoping, and read-only exposure.
// Dependencies: teamwork-mcp-core
// ============================================================================

//! Toolset-model integration tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions use unwrap for clarity."
)]

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;
use teamwork_mcp_core::AuthClaims;
use teamwork_mcp_core::HandlerError;
use teamwork_mcp_core::Method;
use teamwork_mcp_core::MethodRegistry;
use teamwork_mcp_core::ToolAnnotations;
use teamwork_mcp_core::ToolDefinition;
use teamwork_mcp_core::ToolHandler;
use teamwork_mcp_core::ToolKind;
use teamwork_mcp_core::ToolWrapper;
use teamwork_mcp_core::Toolset;
use teamwork_mcp_core::ToolsetGroup;

/// Handler stub that echoes its arguments.
struct EchoHandler;

#[async_trait]
impl ToolHandler for EchoHandler {
    async fn call(&self, args: Value, _claims: &AuthClaims) -> Result<Value, HandlerError> {
        Ok(args)
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

fn projects_registry() -> MethodRegistry {
    let mut registry = MethodRegistry::new();
    registry.register("twprojects-get_task").unwrap();
    registry.register("twprojects-create_task").unwrap();
    registry
}

fn projects_toolset() -> Toolset {
    let mut toolset = Toolset::new("projects", "twprojects", "Teamwork Projects tools");
    toolset.add_write_tools([tool("twprojects-create_task", ToolKind::Write)]);
    toolset.add_read_tools([tool("twprojects-get_task", ToolKind::Read)]);
    toolset
}

#[test]
fn registered_methods_stay_registered() {
    let registry = projects_registry();
    for method in registry.all_registered() {
        assert!(registry.is_registered(method.as_str()));
    }
    assert_eq!(registry.len(), 2);
}

#[test]
fn enable_all_exposes_both_then_read_only_vetoes_write() {
    let registry = projects_registry();
    let mut toolset = projects_toolset();
    toolset.enable(&registry, &["all".to_string()]).unwrap();

    let both: Vec<&str> =
        toolset.exposable_tools(false).iter().map(|tool| tool.method().as_str()).collect();
    assert_eq!(both, vec!["twprojects-get_task", "twprojects-create_task"]);

    let reads: Vec<&str> =
        toolset.exposable_tools(true).iter().map(|tool| tool.method().as_str()).collect();
    assert_eq!(reads, vec!["twprojects-get_task"]);
}

#[test]
fn unowned_registered_method_is_silently_ignored() {
    let mut registry = projects_registry();
    registry.register("twdesk-get_ticket").unwrap();
    let mut toolset = projects_toolset();
    toolset
        .enable(
            &registry,
            &["twdesk-get_ticket".to_string(), "twprojects-get_task".to_string()],
        )
        .unwrap();
    let enabled: Vec<&str> = toolset.enabled_methods().iter().map(Method::as_str).collect();
    assert_eq!(enabled, vec!["twprojects-get_task"]);
}

#[test]
fn unregistered_method_is_named_in_the_error() {
    let registry = projects_registry();
    let mut toolset = projects_toolset();
    let err = toolset.enable(&registry, &["twdesk-get_ticket".to_string()]).unwrap_err();
    assert!(err.to_string().contains("twdesk-get_ticket"));
}

#[tokio::test]
async fn wrapper_handler_invokes_through_the_trait_object() {
    let wrapper = tool("twprojects-get_task", ToolKind::Read);
    let handler = wrapper.handler();
    let claims = AuthClaims::anonymous();
    let result = handler.call(json!({"task_id": 7}), &claims).await.unwrap();
    assert_eq!(result, json!({"task_id": 7}));
}

#[test]
fn group_has_tools_tracks_enablement_and_read_only() {
    let registry = projects_registry();

    let mut group = ToolsetGroup::new(false);
    group.add_toolset(projects_toolset());
    assert!(!group.has_tools());
    group.enable(&registry, &["all".to_string()]).unwrap();
    assert!(group.has_tools());

    let mut write_only = Toolset::new("projects", "twprojects", "Teamwork Projects tools");
    write_only.add_write_tools([tool("twprojects-create_task", ToolKind::Write)]);
    let mut read_only_group = ToolsetGroup::new(true);
    read_only_group.add_toolset(write_only);
    read_only_group.enable(&registry, &["all".to_string()]).unwrap();
    assert!(!read_only_group.has_tools());
}
