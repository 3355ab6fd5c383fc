//! Web search adapter backed by the Tavily search API.
//!
//! The fallback tool when neither product database knows a UPC. Results
//! are de-duplicated by URL and normalized into `RetrievedPassage`s; the
//! provider relevance score fills both component scores so the combined
//! score stays an order-preserving function of them.

use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use pantry_core::error::{PantryError, Result};
use pantry_core::tool::{RetrievedPassage, ToolAdapter, ToolDescriptor, ToolPayload, ToolResponse};

use crate::http::{is_retryable_status, require_str};

const BASE_URL: &str = "https://api.tavily.com/search";
const MAX_RESULTS: u32 = 5;

/// `web-search` against Tavily.
#[derive(Clone)]
pub struct TavilySearchAdapter {
    client: Client,
    api_key: String,
    base_url: String,
}

impl TavilySearchAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl ToolAdapter for TavilySearchAdapter {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::single_string_arg(
            "web-search",
            "Searches the web for food product information. Use as a fallback when the \
             product databases do not know a UPC, or for general food questions.",
            "query",
            "The search query",
        )
    }

    async fn invoke(&self, arguments: &Map<String, Value>) -> Result<ToolResponse> {
        let query = require_str(arguments, "query")?;

        let request = SearchRequest {
            api_key: self.api_key.clone(),
            query: query.to_string(),
            max_results: MAX_RESULTS,
        };

        let response = self
            .client
            .post(&self.base_url)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                PantryError::upstream(
                    "tavily",
                    None,
                    format!("web search request failed: {err}"),
                    err.is_connect() || err.is_timeout(),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read web search error body".to_string());
            return Err(PantryError::upstream(
                "tavily",
                Some(status.as_u16()),
                body,
                is_retryable_status(status),
            ));
        }

        let parsed: SearchResponse = response.json().await.map_err(|err| {
            PantryError::upstream(
                "tavily",
                None,
                format!("failed to parse web search response: {err}"),
                false,
            )
        })?;

        Ok(into_response(query, parsed))
    }
}

/// Normalizes the provider results, deduplicating by URL.
fn into_response(query: &str, parsed: SearchResponse) -> ToolResponse {
    let mut seen = HashSet::new();
    let passages: Vec<RetrievedPassage> = parsed
        .results
        .into_iter()
        .filter(|result| !result.url.is_empty() && seen.insert(result.url.clone()))
        .map(|result| {
            let score = result.score.unwrap_or(0.0).clamp(0.0, 1.0);
            let text = match result.title {
                Some(title) if !title.trim().is_empty() => {
                    format!("{title}: {}", result.content.unwrap_or_default())
                }
                _ => result.content.unwrap_or_default(),
            };
            RetrievedPassage {
                document_id: result.url,
                text,
                lexical_score: score,
                semantic_score: score,
                combined_score: score,
            }
        })
        .collect();

    if passages.is_empty() {
        ToolResponse::NotFound(format!("web search found nothing for '{query}'"))
    } else {
        ToolResponse::Success(ToolPayload::Passages(passages))
    }
}

#[derive(Serialize)]
struct SearchRequest {
    api_key: String,
    query: String,
    max_results: u32,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResultItem>,
}

#[derive(Deserialize)]
struct SearchResultItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    score: Option<f32>,
}
