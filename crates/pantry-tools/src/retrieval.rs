//! Retrieval tool: the hybrid retriever exposed to the planner.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use pantry_core::error::Result;
use pantry_core::tool::{ToolAdapter, ToolDescriptor, ToolPayload, ToolResponse};
use pantry_retrieval::HybridRetriever;

use crate::http::require_str;

/// `retrieval` over the local product document corpus.
#[derive(Clone)]
pub struct RetrievalAdapter {
    retriever: Arc<HybridRetriever>,
}

impl RetrievalAdapter {
    pub fn new(retriever: Arc<HybridRetriever>) -> Self {
        Self { retriever }
    }
}

#[async_trait]
impl ToolAdapter for RetrievalAdapter {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::single_string_arg(
            "retrieval",
            "Searches the local product knowledge base (curated product documents) with \
             combined exact-match and semantic ranking. Good for product descriptions, \
             comparisons, and UPC-specific documents.",
            "query",
            "The search query; include the UPC verbatim when one is known",
        )
    }

    async fn invoke(&self, arguments: &Map<String, Value>) -> Result<ToolResponse> {
        let query = require_str(arguments, "query")?;
        let passages = self.retriever.retrieve(query).await?;
        if passages.is_empty() {
            Ok(ToolResponse::NotFound(format!(
                "the product knowledge base has nothing for '{query}'"
            )))
        } else {
            Ok(ToolResponse::Success(ToolPayload::Passages(passages)))
        }
    }
}
