// crates/teamwork-mcp-core/src/toolset.rs
// ============================================================================
// Module: Toolsets
// Description: Named, independently enableable bundles of read/write tools.
// Purpose: Separate a toolset's static inventory from its enabled selection.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A toolset owns a static inventory of read and write tool wrappers and an
//! `enabled` selection narrowed by the operator's enable list. Separating
//! "owned" from "enabled" lets an operator disable destructive operations
//! without altering the inventory, while read-only mode acts as an
//! orthogonal, always-enforced veto over write tools.
//!
//! ## Invariants
//! - `enabled` is always a subset of the owned method universe.
//! - Tool wrappers are immutable once constructed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::handler::ToolHandler;
use crate::method::METHOD_ALL;
use crate::method::Method;
use crate::registry::MethodRegistry;

// ============================================================================
// SECTION: Tool Classification
// ============================================================================

/// Read/write classification for a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    /// The tool only reads upstream state.
    Read,
    /// The tool mutates upstream state.
    Write,
}

impl ToolKind {
    /// Returns true when the tool mutates upstream state.
    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(self, Self::Write)
    }
}

// ============================================================================
// SECTION: Tool Definitions
// ============================================================================

/// Annotations attached to a tool listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    /// Human-readable tool title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Hint that the tool does not mutate state.
    pub read_only_hint: bool,
}

/// Tool definition used by MCP tool listing.
///
/// # Invariants
/// - `name` is a registered method identifier.
/// - `input_schema` is an opaque JSON Schema payload supplied by the tool
///   definition module; this core never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Method identifier advertised to clients.
    pub name: Method,
    /// Tool description for clients.
    pub description: String,
    /// JSON schema for tool input.
    pub input_schema: Value,
    /// Listing annotations.
    pub annotations: ToolAnnotations,
}

// ============================================================================
// SECTION: Tool Wrapper
// ============================================================================

/// Immutable pairing of a tool's metadata with its invocation handler.
#[derive(Clone)]
pub struct ToolWrapper {
    /// Method identifier for dispatch.
    method: Method,
    /// Read/write classification.
    kind: ToolKind,
    /// Listing definition.
    definition: ToolDefinition,
    /// Opaque invocation handler, consumed but never owned by this core.
    handler: Arc<dyn ToolHandler>,
}

impl ToolWrapper {
    /// Creates a tool wrapper from its definition and handler.
    #[must_use]
    pub fn new(kind: ToolKind, definition: ToolDefinition, handler: Arc<dyn ToolHandler>) -> Self {
        Self {
            method: definition.name.clone(),
            kind,
            definition,
            handler,
        }
    }

    /// Returns the method identifier.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the read/write classification.
    #[must_use]
    pub const fn kind(&self) -> ToolKind {
        self.kind
    }

    /// Returns the listing definition.
    #[must_use]
    pub const fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    /// Returns the invocation handler.
    #[must_use]
    pub fn handler(&self) -> Arc<dyn ToolHandler> {
        Arc::clone(&self.handler)
    }
}

impl fmt::Debug for ToolWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolWrapper")
            .field("method", &self.method)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Toolset
// ============================================================================

/// Named bundle of read/write tools with an enabled selection.
#[derive(Debug, Clone)]
pub struct Toolset {
    /// Toolset name; doubles as the scope vocabulary entry.
    name: String,
    /// Method prefix owned by this toolset.
    prefix: String,
    /// Toolset description.
    description: String,
    /// Read tool inventory.
    read_tools: Vec<ToolWrapper>,
    /// Write tool inventory.
    write_tools: Vec<ToolWrapper>,
    /// Currently enabled methods.
    enabled: BTreeSet<Method>,
}

impl Toolset {
    /// Creates an empty toolset.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        prefix: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            description: description.into(),
            read_tools: Vec::new(),
            write_tools: Vec::new(),
            enabled: BTreeSet::new(),
        }
    }

    /// Returns the toolset name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the method prefix owned by this toolset.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the toolset description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Appends read tools to the inventory.
    pub fn add_read_tools(&mut self, tools: impl IntoIterator<Item = ToolWrapper>) {
        self.read_tools.extend(tools);
    }

    /// Appends write tools to the inventory.
    pub fn add_write_tools(&mut self, tools: impl IntoIterator<Item = ToolWrapper>) {
        self.write_tools.extend(tools);
    }

    /// Returns the currently enabled methods.
    #[must_use]
    pub const fn enabled_methods(&self) -> &BTreeSet<Method> {
        &self.enabled
    }

    /// Computes `enabled` from a requested enable list.
    ///
    /// The [`METHOD_ALL`] sentinel selects every owned method. Requested
    /// methods that are registered globally but owned by another toolset are
    /// silently ignored (ownership is toolset-scoped, not global). Every
    /// owned method must itself be registered; offenders are collected and
    /// reported together with unregistered requested methods.
    ///
    /// # Errors
    ///
    /// Returns [`EnableError`] when the inventory contains duplicate or
    /// unregistered methods, or the request names unregistered methods. All
    /// are configuration errors; callers must treat them as startup-fatal.
    pub fn enable(
        &mut self,
        registry: &MethodRegistry,
        requested: &[String],
    ) -> Result<(), EnableError> {
        let owned = self.owned_methods()?;
        let mut unregistered: Vec<String> = owned
            .iter()
            .filter(|method| !registry.is_registered(method.as_str()))
            .map(|method| method.as_str().to_string())
            .collect();
        let mut selected = BTreeSet::new();
        let mut select_all = false;
        for token in requested {
            if token == METHOD_ALL {
                select_all = true;
            } else if let Some(method) = owned.get(token.as_str()) {
                selected.insert(method.clone());
            } else if !registry.is_registered(token) {
                unregistered.push(token.clone());
            }
        }
        if !unregistered.is_empty() {
            return Err(EnableError::UnregisteredMethods {
                toolset: self.name.clone(),
                methods: unregistered,
            });
        }
        self.enabled = if select_all { owned } else { selected };
        Ok(())
    }

    /// Returns true when at least one method is enabled.
    #[must_use]
    pub fn has_tools(&self) -> bool {
        !self.enabled.is_empty()
    }

    /// Returns enabled read tools, plus enabled write tools unless
    /// `read_only` is set.
    #[must_use]
    pub fn exposable_tools(&self, read_only: bool) -> Vec<&ToolWrapper> {
        let mut tools: Vec<&ToolWrapper> = self
            .read_tools
            .iter()
            .filter(|tool| self.enabled.contains(tool.method()))
            .collect();
        if !read_only {
            tools.extend(
                self.write_tools.iter().filter(|tool| self.enabled.contains(tool.method())),
            );
        }
        tools
    }

    /// Collects the owned method universe, rejecting duplicates.
    fn owned_methods(&self) -> Result<BTreeSet<Method>, EnableError> {
        let mut owned = BTreeSet::new();
        let mut duplicates = Vec::new();
        for tool in self.read_tools.iter().chain(&self.write_tools) {
            if !owned.insert(tool.method().clone()) {
                duplicates.push(tool.method().as_str().to_string());
            }
        }
        if duplicates.is_empty() {
            Ok(owned)
        } else {
            Err(EnableError::DuplicateMethods {
                toolset: self.name.clone(),
                methods: duplicates,
            })
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Toolset enablement errors.
#[derive(Debug, Error)]
pub enum EnableError {
    /// The enable list named methods that are not registered anywhere.
    #[error("toolset {toolset}: unregistered methods: {}", methods.join(", "))]
    UnregisteredMethods {
        /// Toolset that rejected the enable list.
        toolset: String,
        /// Every unregistered token, not just the first.
        methods: Vec<String>,
    },
    /// The toolset inventory contains the same method more than once.
    #[error("toolset {toolset}: duplicate methods: {}", methods.join(", "))]
    DuplicateMethods {
        /// Toolset with the duplicated inventory.
        toolset: String,
        /// Duplicated method identifiers.
        methods: Vec<String>,
    },
}

// ============================================================================
// SECTION: Tests
// ============================================================================
