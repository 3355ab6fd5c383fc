//! Engine configuration.
//!
//! Loaded from a TOML file with serde defaults for every field, so a partial
//! (or absent) config file always yields a runnable configuration. API keys
//! may come from the config file or from environment variables; the file
//! takes priority when both are present.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Root configuration for the Pantry engine.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct PantryConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Orchestrator and tool-dispatch tuning.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct EngineConfig {
    /// Maximum planner invocations per query before aborting.
    #[serde(default = "default_max_planning_iterations")]
    pub max_planning_iterations: u32,
    /// Hard per-tool-call timeout in seconds.
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    /// Retry bound for transient tool failures.
    #[serde(default = "default_max_tool_retries")]
    pub max_tool_retries: u32,
    /// Base backoff between retries in milliseconds (doubled per attempt).
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl EngineConfig {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_planning_iterations: default_max_planning_iterations(),
            tool_timeout_secs: default_tool_timeout_secs(),
            max_tool_retries: default_max_tool_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Hybrid retriever tuning.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RetrievalConfig {
    /// Number of passages returned per retrieval call.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Fusion weight for the lexical stage.
    #[serde(default = "default_stage_weight")]
    pub lexical_weight: f32,
    /// Fusion weight for the semantic stage.
    #[serde(default = "default_stage_weight")]
    pub semantic_weight: f32,
    /// Character length of a corpus chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Character overlap between consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Directory of `.txt` product documents to index.
    #[serde(default)]
    pub corpus_dir: Option<PathBuf>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            lexical_weight: default_stage_weight(),
            semantic_weight: default_stage_weight(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            corpus_dir: None,
        }
    }
}

/// Session memory budgets and lifecycle.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SessionConfig {
    /// Maximum turns kept in the rendered history.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    /// Approximate character budget for the rendered history.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    /// Sessions idle longer than this are purged.
    #[serde(default = "default_idle_ttl_secs")]
    pub idle_ttl_secs: u64,
    /// Minimum interval between idle sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl SessionConfig {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            max_context_chars: default_max_context_chars(),
            idle_ttl_secs: default_idle_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Upstream API credentials and model selection.
///
/// Keys are redacted from the `Debug` representation; they must never
/// appear in logs or error messages.
#[derive(Deserialize, Serialize, Clone, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default)]
    pub usda_api_key: Option<String>,
    #[serde(default)]
    pub tavily_api_key: Option<String>,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    /// Planner model name.
    #[serde(default = "default_claude_model")]
    pub claude_model: String,
    /// Embedding model name for the semantic retrieval stage.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("anthropic_api_key", &redact(&self.anthropic_api_key))
            .field("usda_api_key", &redact(&self.usda_api_key))
            .field("tavily_api_key", &redact(&self.tavily_api_key))
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("claude_model", &self.claude_model)
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

fn redact(key: &Option<String>) -> &'static str {
    match key {
        Some(_) => "***",
        None => "<unset>",
    }
}

impl PantryConfig {
    /// Loads configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&raw)?;
        Ok(config)
    }

    /// Fills missing API keys from environment variables.
    ///
    /// Priority matches the config loading order used across the engine:
    /// config file first, environment second.
    pub fn with_env_fallback(mut self) -> Self {
        let fill = |slot: &mut Option<String>, var: &str| {
            if slot.is_none() {
                if let Ok(value) = std::env::var(var) {
                    if !value.trim().is_empty() {
                        *slot = Some(value);
                    }
                }
            }
        };
        fill(&mut self.api.anthropic_api_key, "ANTHROPIC_API_KEY");
        fill(&mut self.api.usda_api_key, "USDA_API_KEY");
        fill(&mut self.api.tavily_api_key, "TAVILY_API_KEY");
        fill(&mut self.api.openai_api_key, "OPENAI_API_KEY");
        self
    }
}

fn default_max_planning_iterations() -> u32 {
    6
}

fn default_tool_timeout_secs() -> u64 {
    8
}

fn default_max_tool_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    250
}

fn default_top_k() -> usize {
    5
}

fn default_stage_weight() -> f32 {
    0.5
}

fn default_chunk_size() -> usize {
    750
}

fn default_chunk_overlap() -> usize {
    100
}

fn default_max_turns() -> usize {
    15
}

fn default_max_context_chars() -> usize {
    24_000
}

fn default_idle_ttl_secs() -> u64 {
    1800
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_claude_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
