// crates/teamwork-mcp-core/src/method.rs
// ============================================================================
// Module: Method Identifiers
// Description: Validated method identifiers for Teamwork MCP tools.
// Purpose: Provide strongly typed method names with stable string forms.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Method identifiers follow the convention `<toolset-prefix>-<verb>_<entity>`
//! (for example `twprojects-get_task`), all lowercase ASCII. The prefix names
//! the owning toolset and is load-bearing: the scope filter classifies tools
//! by it. Identifiers are validated once at the registration boundary and
//! treated as opaque afterwards.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::borrow::Borrow;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Sentinel accepted in enable lists meaning "every method a toolset owns".
///
/// Not a valid [`Method`] by itself; enable-list parsing recognizes it before
/// method validation applies.
pub const METHOD_ALL: &str = "all";

/// Maximum accepted length of a method identifier in bytes.
const MAX_METHOD_LENGTH: usize = 128;

// ============================================================================
// SECTION: Method Type
// ============================================================================

/// Unique string identifier naming one invocable remote operation.
///
/// # Invariants
/// - Parsed values match `<prefix>-<action>` with a non-empty lowercase
///   alphanumeric prefix and a non-empty `[a-z0-9_]` action part.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Method(String);

impl Method {
    /// Parses and validates a method identifier.
    ///
    /// # Errors
    ///
    /// Returns [`MethodError`] when the identifier is empty, too long, or does
    /// not follow the `<prefix>-<verb>_<entity>` convention.
    pub fn parse(raw: &str) -> Result<Self, MethodError> {
        if raw.is_empty() {
            return Err(MethodError::Empty);
        }
        if raw.len() > MAX_METHOD_LENGTH {
            return Err(MethodError::TooLong(raw.len()));
        }
        let Some((prefix, action)) = raw.split_once('-') else {
            return Err(MethodError::Malformed(raw.to_string()));
        };
        if prefix.is_empty() || action.is_empty() {
            return Err(MethodError::Malformed(raw.to_string()));
        }
        if !prefix.bytes().all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit()) {
            return Err(MethodError::Malformed(raw.to_string()));
        }
        if !action
            .bytes()
            .all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'_')
        {
            return Err(MethodError::Malformed(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Returns the toolset prefix before the first `-` separator.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.0.split_once('-').map_or(self.0.as_str(), |(prefix, _)| prefix)
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Borrow<str> for Method {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Method identifier validation errors.
#[derive(Debug, Error)]
pub enum MethodError {
    /// The identifier was empty.
    #[error("empty method identifier")]
    Empty,
    /// The identifier exceeded the maximum accepted length.
    #[error("method identifier too long: {0} bytes")]
    TooLong(usize),
    /// The identifier did not follow the `<prefix>-<action>` convention.
    #[error("malformed method identifier: {0}")]
    Malformed(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions use unwrap for clarity.")]

    use super::METHOD_ALL;
    use super::Method;
    use super::MethodError;

    #[test]
    fn parse_accepts_convention_names() {
        let method = Method::parse("twprojects-get_task").unwrap();
        assert_eq!(method.prefix(), "twprojects");
        assert_eq!(method.as_str(), "twprojects-get_task");
    }

    #[test]
    fn parse_rejects_missing_separator() {
        assert!(matches!(Method::parse("twprojects"), Err(MethodError::Malformed(_))));
    }

    #[test]
    fn parse_rejects_all_sentinel() {
        assert!(Method::parse(METHOD_ALL).is_err());
    }

    #[test]
    fn parse_rejects_uppercase() {
        assert!(Method::parse("TwDesk-get_ticket").is_err());
    }

    #[test]
    fn parse_rejects_empty_parts() {
        assert!(Method::parse("-get_task").is_err());
        assert!(Method::parse("twdesk-").is_err());
        assert!(Method::parse("").is_err());
    }

    #[test]
    fn parse_rejects_oversized_identifier() {
        let raw = format!("twdesk-{}", "a".repeat(200));
        assert!(matches!(Method::parse(&raw), Err(MethodError::TooLong(_))));
    }
}
