// crates/teamwork-mcp-server/src/config.rs
// ============================================================================
// Module: Server Configuration
// Description: Configuration loading and validation for the Teamwork MCP server.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size limits. Missing
//! or invalid configuration fails closed: validation errors abort startup
//! entirely, never producing a partially-configured server. The enable list
//! (`server.toolsets`) is parsed here but validated against the method
//! registry at startup so every invalid token is reported in one joined
//! error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "teamwork-mcp.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "TEAMWORK_MCP_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum number of server auth tokens.
const MAX_AUTH_TOKENS: usize = 64;
/// Maximum length of a server auth token.
const MAX_AUTH_TOKEN_LENGTH: usize = 256;
/// Maximum number of scopes attached to one token.
const MAX_SCOPES_PER_TOKEN: usize = 32;
/// Default maximum request body size in bytes.
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Transport selection for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerTransport {
    /// JSON-RPC over stdin/stdout with Content-Length framing.
    Stdio,
    /// JSON-RPC over HTTP POST.
    Http,
}

/// Top-level Teamwork MCP configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TeamworkMcpConfig {
    /// Server transport and policy configuration.
    pub server: ServerConfig,
}

/// Server transport and policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Transport used to serve requests.
    #[serde(default = "default_transport")]
    pub transport: ServerTransport,
    /// Bind address for the HTTP transport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    /// Maximum allowed request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Global read-only veto over write tools.
    #[serde(default)]
    pub read_only: bool,
    /// Comma-separated enable list of methods, or the `all` sentinel.
    #[serde(default = "default_toolsets")]
    pub toolsets: String,
    /// Authentication configuration; absent means no credential resolves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<ServerAuthConfig>,
}

/// Authentication configuration for the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerAuthConfig {
    /// Accepted bearer tokens with their resolved identities.
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
}

/// One accepted bearer token and the identity it resolves to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenConfig {
    /// Bearer token value.
    pub token: String,
    /// Customer installation URL the token resolves to.
    pub customer_url: Url,
    /// Scopes granted to the token; empty means unrestricted listing.
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Returns the default transport.
const fn default_transport() -> ServerTransport {
    ServerTransport::Stdio
}

/// Returns the default maximum body size.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Returns the default enable list.
fn default_toolsets() -> String {
    "all".to_string()
}

// ============================================================================
// SECTION: Loading and Validation
// ============================================================================

impl TeamworkMcpConfig {
    /// Loads configuration from the given path, the `TEAMWORK_MCP_CONFIG`
    /// environment variable, or the default filename, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is missing, oversized, or fails
    /// to parse.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map_or_else(default_config_path, Path::to_path_buf);
        let metadata =
            fs::metadata(&path).map_err(|err| ConfigError::Io(path.display().to_string(), err))?;
        let size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if size > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::TooLarge(size));
        }
        let raw = fs::read_to_string(&path)
            .map_err(|err| ConfigError::Io(path.display().to_string(), err))?;
        let config: Self = toml::from_str(&raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        Ok(config)
    }

    /// Validates the configuration, failing closed on any violation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.transport == ServerTransport::Http && self.server.bind.is_none() {
            return Err(ConfigError::Invalid("http transport requires server.bind".to_string()));
        }
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::Invalid("max_body_bytes must be non-zero".to_string()));
        }
        if let Some(auth) = &self.server.auth {
            if auth.tokens.len() > MAX_AUTH_TOKENS {
                return Err(ConfigError::Invalid(format!(
                    "too many auth tokens: {} (max {MAX_AUTH_TOKENS})",
                    auth.tokens.len()
                )));
            }
            for token in &auth.tokens {
                if token.token.is_empty() {
                    return Err(ConfigError::Invalid("empty auth token".to_string()));
                }
                if token.token.len() > MAX_AUTH_TOKEN_LENGTH {
                    return Err(ConfigError::Invalid(format!(
                        "auth token too long: {} bytes (max {MAX_AUTH_TOKEN_LENGTH})",
                        token.token.len()
                    )));
                }
                if token.scopes.len() > MAX_SCOPES_PER_TOKEN {
                    return Err(ConfigError::Invalid(format!(
                        "too many scopes for token: {} (max {MAX_SCOPES_PER_TOKEN})",
                        token.scopes.len()
                    )));
                }
            }
        }
        parse_enable_list(&self.server.toolsets)?;
        Ok(())
    }

    /// Parses the configured enable list into individual tokens.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the list is empty or contains
    /// blank entries.
    pub fn enable_list(&self) -> Result<Vec<String>, ConfigError> {
        parse_enable_list(&self.server.toolsets)
    }
}

/// Splits a comma-separated enable list into trimmed tokens.
///
/// Registry validation happens later via toolset enablement so that every
/// invalid token is reported in one joined error.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the list is empty or contains blank
/// entries.
pub fn parse_enable_list(raw: &str) -> Result<Vec<String>, ConfigError> {
    let mut tokens = Vec::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err(ConfigError::Invalid(format!("blank entry in enable list: {raw:?}")));
        }
        tokens.push(entry.to_string());
    }
    if tokens.is_empty() {
        return Err(ConfigError::Invalid("empty enable list".to_string()));
    }
    Ok(tokens)
}

/// Resolves the default config path from the environment or working directory.
fn default_config_path() -> PathBuf {
    env::var_os(CONFIG_ENV_VAR).map_or_else(|| PathBuf::from(DEFAULT_CONFIG_NAME), PathBuf::from)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors. All are startup-fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Filesystem access failed.
    #[error("config io error for {0}: {1}")]
    Io(String, #[source] std::io::Error),
    /// The configuration file exceeded the size limit.
    #[error("config file too large: {0} bytes")]
    TooLarge(usize),
    /// TOML parsing failed.
    #[error("config parse error: {0}")]
    Parse(String),
    /// A validation constraint was violated.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions use unwrap for clarity.")]

    use super::ServerTransport;
    use super::TeamworkMcpConfig;
    use super::parse_enable_list;

    #[test]
    fn parse_enable_list_splits_and_trims() {
        let tokens = parse_enable_list("twprojects-get_task, twdesk-get_ticket").unwrap();
        assert_eq!(tokens, vec!["twprojects-get_task", "twdesk-get_ticket"]);
    }

    #[test]
    fn parse_enable_list_rejects_blank_entries() {
        assert!(parse_enable_list("twprojects-get_task,,twdesk-get_ticket").is_err());
        assert!(parse_enable_list("").is_err());
    }

    #[test]
    fn defaults_serve_stdio_with_all_toolsets() {
        let config: TeamworkMcpConfig = toml::from_str("[server]\n").unwrap();
        assert_eq!(config.server.transport, ServerTransport::Stdio);
        assert_eq!(config.server.toolsets, "all");
        assert!(!config.server.read_only);
        config.validate().unwrap();
    }

    #[test]
    fn validate_requires_bind_for_http() {
        let config: TeamworkMcpConfig =
            toml::from_str("[server]\ntransport = \"http\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_tokens() {
        let raw = r#"
[server]
[[server.auth.tokens]]
token = ""
customer_url = "https://example.teamwork.com"
"#;
        let config: TeamworkMcpConfig = toml::from_str(raw).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<TeamworkMcpConfig, _> =
            toml::from_str("[server]\nunknown_field = true\n");
        assert!(result.is_err());
    }

    #[test]
    fn load_reads_a_config_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("teamwork-mcp.toml");
        std::fs::write(&path, "[server]\nread_only = true\n").unwrap();
        let config = TeamworkMcpConfig::load(Some(&path)).unwrap();
        assert!(config.server.read_only);
    }

    #[test]
    fn load_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(TeamworkMcpConfig::load(Some(&path)).is_err());
    }
}
