//! The reasoning capability boundary.
//!
//! The orchestrator only ever sees [`PlannerDecision`]: invoke one tool,
//! or deliver the final answer. `ClaudePlanner` implements the trait
//! against the Anthropic Messages REST API with the tool descriptors
//! passed through as a native `tools` array; any backend honoring the
//! decision contract can be substituted.

use std::env;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use pantry_core::config::ApiConfig;
use pantry_core::error::{PantryError, Result};
use pantry_core::tool::{ToolCall, ToolDescriptor};

use crate::context::PlanningContext;
use crate::prompts::ASSISTANT_SYSTEM_PROMPT;

const BASE_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 2048;

/// What the reasoning capability decided to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannerDecision {
    ToolCall(ToolCall),
    FinalAnswer(String),
}

/// The opaque reasoning capability.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(
        &self,
        context: &PlanningContext,
        tools: &[ToolDescriptor],
    ) -> Result<PlannerDecision>;
}

/// Planner implementation over the Claude HTTP API.
#[derive(Clone)]
pub struct ClaudePlanner {
    client: Client,
    api_key: String,
    model: String,
    system: String,
    max_tokens: u32,
}

impl ClaudePlanner {
    /// Creates a new planner with the provided API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            system: ASSISTANT_SYSTEM_PROMPT.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Builds a planner from config, falling back to `ANTHROPIC_API_KEY`.
    pub fn from_config(api: &ApiConfig) -> Result<Self> {
        let api_key = api
            .anthropic_api_key
            .clone()
            .or_else(|| env::var("ANTHROPIC_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                PantryError::config(
                    "no Anthropic API key in config or ANTHROPIC_API_KEY environment variable",
                )
            })?;
        Ok(Self::new(api_key, api.claude_model.clone()))
    }

    /// Overrides the system prompt.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    /// Sets the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    async fn send_request(&self, body: &CreateMessageRequest) -> Result<CreateMessageResponse> {
        let response = self
            .client
            .post(BASE_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|err| {
                PantryError::upstream(
                    "claude",
                    None,
                    format!("Claude API request failed: {err}"),
                    err.is_connect() || err.is_timeout(),
                )
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read Claude error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        response.json().await.map_err(|err| {
            PantryError::upstream(
                "claude",
                None,
                format!("failed to parse Claude response: {err}"),
                false,
            )
        })
    }
}

#[async_trait]
impl Planner for ClaudePlanner {
    async fn plan(
        &self,
        context: &PlanningContext,
        tools: &[ToolDescriptor],
    ) -> Result<PlannerDecision> {
        let messages: Vec<Message> = context
            .render_messages()
            .into_iter()
            .map(|message| Message {
                role: message.role.as_str(),
                content: message.content,
            })
            .collect();

        let request = CreateMessageRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: self.system.clone(),
            messages,
            tools: tools
                .iter()
                .map(|descriptor| ToolSpec {
                    name: descriptor.name.clone(),
                    description: descriptor.description.clone(),
                    input_schema: descriptor.input_schema.clone(),
                })
                .collect(),
        };

        let response = self.send_request(&request).await?;
        decision_from_content(response.content)
    }
}

/// Picks the first tool-use block; otherwise joins the text blocks into
/// the final answer.
fn decision_from_content(content: Vec<ContentBlock>) -> Result<PlannerDecision> {
    let mut texts = Vec::new();
    for block in content {
        match block {
            ContentBlock::ToolUse { name, input, .. } => {
                let arguments = match input {
                    Value::Object(map) => map,
                    Value::Null => serde_json::Map::new(),
                    other => {
                        return Err(PantryError::upstream(
                            "claude",
                            None,
                            format!("tool input was not an object: {other}"),
                            false,
                        ));
                    }
                };
                return Ok(PlannerDecision::ToolCall(ToolCall::new(name, arguments)));
            }
            ContentBlock::Text { text } => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    texts.push(trimmed.to_string());
                }
            }
        }
    }

    if texts.is_empty() {
        Err(PantryError::upstream(
            "claude",
            None,
            "Claude returned neither a tool call nor answer text",
            false,
        ))
    } else {
        Ok(PlannerDecision::FinalAnswer(texts.join("\n\n")))
    }
}

fn map_http_error(status: StatusCode, body: String) -> PantryError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or_else(|_| body.clone());

    let is_retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    PantryError::upstream("claude", Some(status.as_u16()), message, is_retryable)
}

#[derive(Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolSpec>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ToolSpec {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        #[allow(dead_code)]
        id: String,
        name: String,
        input: Value,
    },
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[allow(dead_code)]
    r#type: String,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_use_block_wins_over_text() {
        let content: Vec<ContentBlock> = serde_json::from_value(serde_json::json!([
            { "type": "text", "text": "Let me validate that code." },
            {
                "type": "tool_use",
                "id": "toolu_1",
                "name": "upc-validate",
                "input": { "upc": "028400433303" }
            }
        ]))
        .unwrap();

        let decision = decision_from_content(content).unwrap();
        let PlannerDecision::ToolCall(call) = decision else {
            panic!("expected a tool call");
        };
        assert_eq!(call.tool_name, "upc-validate");
        assert_eq!(call.arg_str("upc"), Some("028400433303"));
    }

    #[test]
    fn text_blocks_join_into_final_answer() {
        let content: Vec<ContentBlock> = serde_json::from_value(serde_json::json!([
            { "type": "text", "text": "Hot Chips contain gluten." },
            { "type": "text", "text": "Source: OpenFoodFacts." }
        ]))
        .unwrap();

        let decision = decision_from_content(content).unwrap();
        assert_eq!(
            decision,
            PlannerDecision::FinalAnswer(
                "Hot Chips contain gluten.\n\nSource: OpenFoodFacts.".into()
            )
        );
    }

    #[test]
    fn null_tool_input_becomes_empty_arguments() {
        let content: Vec<ContentBlock> = serde_json::from_value(serde_json::json!([
            { "type": "tool_use", "id": "toolu_2", "name": "retrieval", "input": null }
        ]))
        .unwrap();

        let PlannerDecision::ToolCall(call) = decision_from_content(content).unwrap() else {
            panic!("expected a tool call");
        };
        assert!(call.arguments.is_empty());
    }

    #[test]
    fn empty_content_is_an_upstream_error() {
        assert!(decision_from_content(Vec::new()).is_err());
    }
}
