//! Tool invocation contract.
//!
//! The orchestrator talks to every capability through [`ToolAdapter`]:
//! one `invoke` taking JSON arguments and returning a normalized payload.
//! "Not found" is a first-class response, not an error; errors crossing
//! this boundary are reserved for faults (network, upstream, bad config)
//! that the dispatcher converts into `ToolResult` statuses.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::product::ProductRecord;
use crate::upc::UpcValidation;

/// One passage returned by the hybrid retriever or web search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub document_id: String,
    pub text: String,
    pub lexical_score: f32,
    pub semantic_score: f32,
    pub combined_score: f32,
}

/// A tool invocation request produced by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
    #[serde(default)]
    pub attempt: u32,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
            attempt: 0,
        }
    }

    /// Convenience accessor for a string argument.
    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }
}

/// Terminal status of one tool invocation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Ok,
    NotFound,
    Error,
    Timeout,
}

impl std::fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Ok => "ok",
            Self::NotFound => "not found",
            Self::Error => "error",
            Self::Timeout => "timeout",
        };
        write!(f, "{label}")
    }
}

/// Normalized tool output. The orchestrator never sees upstream shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ToolPayload {
    Product(ProductRecord),
    Passages(Vec<RetrievedPassage>),
    Validation(UpcValidation),
    Text(String),
    /// Error or not-found detail.
    Detail(String),
}

impl ToolPayload {
    /// Compact rendering for evidence folding and logs.
    pub fn summary(&self) -> String {
        match self {
            Self::Product(record) => record.summary(),
            Self::Passages(passages) => {
                format!("{} passage(s) retrieved", passages.len())
            }
            Self::Validation(validation) => match (&validation.normalized, &validation.reason) {
                (Some(code), _) => format!("valid UPC-A {code}"),
                (None, Some(reason)) => format!("invalid UPC-A: {reason}"),
                (None, None) => "invalid UPC-A".to_string(),
            },
            Self::Text(text) | Self::Detail(text) => text.clone(),
        }
    }
}

/// Successful adapter response: either a payload or a first-class miss.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResponse {
    Success(ToolPayload),
    NotFound(String),
}

/// The immutable outcome of one tool invocation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_name: String,
    pub status: ToolStatus,
    pub payload: ToolPayload,
    pub elapsed: Duration,
}

impl ToolResult {
    pub fn ok(tool_name: impl Into<String>, payload: ToolPayload, elapsed: Duration) -> Self {
        Self {
            tool_name: tool_name.into(),
            status: ToolStatus::Ok,
            payload,
            elapsed,
        }
    }

    pub fn not_found(tool_name: impl Into<String>, detail: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            tool_name: tool_name.into(),
            status: ToolStatus::NotFound,
            payload: ToolPayload::Detail(detail.into()),
            elapsed,
        }
    }

    pub fn error(tool_name: impl Into<String>, detail: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            tool_name: tool_name.into(),
            status: ToolStatus::Error,
            payload: ToolPayload::Detail(detail.into()),
            elapsed,
        }
    }

    pub fn timeout(tool_name: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            tool_name: tool_name.into(),
            status: ToolStatus::Timeout,
            payload: ToolPayload::Detail("no response within the timeout".into()),
            elapsed,
        }
    }

    /// Whether this result carries a resolved product record.
    pub fn resolved_product(&self) -> Option<&ProductRecord> {
        match (&self.status, &self.payload) {
            (ToolStatus::Ok, ToolPayload::Product(record)) => Some(record),
            _ => None,
        }
    }

    /// Evidence line folded into the planning context.
    pub fn evidence(&self) -> String {
        format!(
            "[{} -> {}] {}",
            self.tool_name,
            self.status,
            self.payload.summary()
        )
    }
}

/// Description of one tool the planner may invoke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments object.
    pub input_schema: Value,
}

impl ToolDescriptor {
    /// Descriptor for a tool taking a single required string argument.
    pub fn single_string_arg(
        name: impl Into<String>,
        description: impl Into<String>,
        arg_name: &str,
        arg_description: &str,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    arg_name: {
                        "type": "string",
                        "description": arg_description,
                    }
                },
                "required": [arg_name],
            }),
        }
    }
}

/// Uniform wrapper around one lookup/validation capability.
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    /// Describes the tool to the planner.
    fn descriptor(&self) -> ToolDescriptor;

    /// Invokes the tool with JSON arguments.
    ///
    /// Returns `ToolResponse::NotFound` for a clean miss; `Err` is
    /// reserved for faults the dispatcher may retry or surface as an
    /// error status.
    async fn invoke(&self, arguments: &Map<String, Value>) -> Result<ToolResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evidence_line_carries_tool_status_and_summary() {
        let result = ToolResult::not_found(
            "product-facts-lookup",
            "UPC 028400433303 not catalogued",
            Duration::from_millis(120),
        );
        assert_eq!(
            result.evidence(),
            "[product-facts-lookup -> not found] UPC 028400433303 not catalogued"
        );
        assert!(result.resolved_product().is_none());
    }

    #[test]
    fn single_string_arg_schema_marks_argument_required() {
        let descriptor = ToolDescriptor::single_string_arg(
            "upc-validate",
            "Validates a UPC-A code",
            "upc",
            "The UPC code to validate",
        );
        assert_eq!(descriptor.input_schema["required"][0], "upc");
        assert_eq!(descriptor.input_schema["properties"]["upc"]["type"], "string");
    }
}
