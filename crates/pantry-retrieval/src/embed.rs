//! Embedding backends for the semantic retrieval stage.
//!
//! The embedding model is an external collaborator behind the [`Embedder`]
//! trait. `HttpEmbedder` talks to an OpenAI-compatible `/embeddings`
//! endpoint; `HashEmbedder` is a deterministic, dependency-free fallback
//! for tests and offline runs.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use pantry_core::error::{PantryError, Result};

use crate::lexical::tokenize;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Produces a fixed-length vector for a piece of text.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Cosine similarity; zero for mismatched or degenerate vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator <= f32::EPSILON {
        0.0
    } else {
        dot / denominator
    }
}

/// Client for an OpenAI-compatible embeddings endpoint.
#[derive(Clone)]
pub struct HttpEmbedder {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl HttpEmbedder {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Overrides the endpoint base URL (for compatible providers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embeddings", self.base_url);
        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: text.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                PantryError::upstream(
                    "embeddings",
                    None,
                    format!("embedding request failed: {err}"),
                    err.is_connect() || err.is_timeout(),
                )
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read embedding error body".to_string());
            return Err(PantryError::upstream(
                "embeddings",
                Some(status.as_u16()),
                body,
                is_retryable_status(status),
            ));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|err| {
            PantryError::upstream(
                "embeddings",
                None,
                format!("failed to parse embedding response: {err}"),
                false,
            )
        })?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| {
                PantryError::upstream("embeddings", None, "empty embedding response", false)
            })
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

/// Deterministic token-hashing embedder.
///
/// Hashes each token into a fixed number of buckets (FNV-1a) and
/// L2-normalizes the result. Not a semantic model; it gives stable,
/// overlap-sensitive vectors without any network dependency.
#[derive(Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in tokenize(text) {
            let bucket = (fnv1a(token.as_bytes()) as usize) % self.dimension;
            vector[bucket] += 1.0;
        }
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET_BASIS;
    for &byte in bytes {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}
