//! Error types for the Pantry engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire Pantry workspace.
///
/// This provides typed, structured error variants with automatic conversion
/// from common error types via the `From` trait. Failures that cross the
/// tool boundary are not raised as errors at all; they are folded into
/// `ToolResult` values so the planning loop can reason over them.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum PantryError {
    /// Malformed user-supplied value (e.g. a UPC that fails validation).
    /// Recovered locally and surfaced as a clarifying answer.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A tool did not respond within its per-call timeout.
    #[error("Tool '{tool}' timed out")]
    ToolTimeout { tool: String },

    /// A tool could not be invoked at all (unknown name, missing key).
    #[error("Tool '{tool}' unavailable: {message}")]
    ToolUnavailable { tool: String, message: String },

    /// The planning loop hit its iteration bound without an answer.
    #[error("Planning exhausted after {iterations} iterations")]
    PlanningExhausted { iterations: u32 },

    /// An upstream service returned a failure.
    #[error("Upstream error from {service}: {message}")]
    Upstream {
        service: String,
        status: Option<u16>,
        message: String,
        retryable: bool,
    },

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PantryError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a ToolTimeout error
    pub fn tool_timeout(tool: impl Into<String>) -> Self {
        Self::ToolTimeout { tool: tool.into() }
    }

    /// Creates a ToolUnavailable error
    pub fn tool_unavailable(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolUnavailable {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Creates an Upstream error
    pub fn upstream(
        service: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self::Upstream {
            service: service.into(),
            status,
            message: message.into(),
            retryable,
        }
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a Validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a ToolTimeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ToolTimeout { .. })
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if a retry could plausibly succeed.
    ///
    /// True only for upstream failures flagged retryable (connect errors,
    /// request timeouts, HTTP 429/5xx). Everything else is permanent for
    /// the purposes of one query.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Upstream { retryable: true, .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for PantryError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for PantryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for PantryError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from String (for error messages)
impl From<String> for PantryError {
    fn from(err: String) -> Self {
        Self::Internal(err)
    }
}

/// A type alias for `Result<T, PantryError>`.
pub type Result<T> = std::result::Result<T, PantryError>;
