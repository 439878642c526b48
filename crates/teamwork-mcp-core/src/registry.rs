// crates/teamwork-mcp-core/src/registry.rs
// ============================================================================
// Module: Method Registry
// Description: Process-wide registry of known method identifiers.
// Purpose: Act as the single source of truth for "is this a real method".
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! The method registry is an explicit object constructed once at process
//! start and injected into every component that validates method names.
//! Registration failures are configuration errors and must abort startup;
//! lookups never fail and simply answer `false` for unknown identifiers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use thiserror::Error;

use crate::method::Method;
use crate::method::MethodError;

// ============================================================================
// SECTION: Method Registry
// ============================================================================

/// Registry of every method identifier known to the process.
///
/// # Invariants
/// - Each method is registered exactly once; duplicates are rejected.
/// - The registry is immutable once the server starts accepting traffic.
#[derive(Debug, Clone, Default)]
pub struct MethodRegistry {
    /// Registered method identifiers in sorted order.
    methods: BTreeSet<Method>,
}

impl MethodRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and registers a method identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the identifier is malformed or already
    /// registered. Both are programmer errors; callers must treat them as
    /// fatal at startup rather than runtime conditions.
    pub fn register(&mut self, raw: &str) -> Result<Method, RegistryError> {
        let method = Method::parse(raw)?;
        if !self.methods.insert(method.clone()) {
            return Err(RegistryError::Duplicate(method));
        }
        Ok(method)
    }

    /// Returns whether the identifier names a registered method.
    #[must_use]
    pub fn is_registered(&self, raw: &str) -> bool {
        self.methods.contains(raw)
    }

    /// Enumerates every registered method in sorted order.
    pub fn all_registered(&self) -> impl Iterator<Item = &Method> {
        self.methods.iter()
    }

    /// Returns the number of registered methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Method registration errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The identifier failed shape validation.
    #[error(transparent)]
    Malformed(#[from] MethodError),
    /// The identifier was already registered.
    #[error("duplicate method registration: {0}")]
    Duplicate(Method),
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions use unwrap for clarity.")]

    use super::MethodRegistry;
    use super::RegistryError;

    #[test]
    fn register_then_lookup() {
        let mut registry = MethodRegistry::new();
        registry.register("twdesk-get_ticket").unwrap();
        assert!(registry.is_registered("twdesk-get_ticket"));
        assert!(!registry.is_registered("twdesk-delete_ticket"));
    }

    #[test]
    fn register_rejects_duplicates() {
        let mut registry = MethodRegistry::new();
        registry.register("twdesk-get_ticket").unwrap();
        let result = registry.register("twdesk-get_ticket");
        assert!(matches!(result, Err(RegistryError::Duplicate(_))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn register_rejects_malformed() {
        let mut registry = MethodRegistry::new();
        assert!(matches!(registry.register("no_separator"), Err(RegistryError::Malformed(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn enumeration_is_sorted() {
        let mut registry = MethodRegistry::new();
        registry.register("twprojects-get_task").unwrap();
        registry.register("twdesk-get_ticket").unwrap();
        let names: Vec<&str> = registry.all_registered().map(super::Method::as_str).collect();
        assert_eq!(names, vec!["twdesk-get_ticket", "twprojects-get_task"]);
    }
}
