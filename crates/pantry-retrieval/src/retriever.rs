//! The hybrid retriever: lexical + semantic stages fused into one ranking.

use std::sync::Arc;

use tracing::debug;

use pantry_core::config::RetrievalConfig;
use pantry_core::error::Result;
use pantry_core::tool::RetrievedPassage;

use crate::corpus::Corpus;
use crate::embed::{Embedder, cosine_similarity};
use crate::fusion::{FusionCandidate, FusionWeights, fuse};
use crate::lexical::LexicalIndex;

/// How many candidates each stage contributes before fusion, relative to
/// the requested result count.
const STAGE_CANDIDATE_FACTOR: usize = 4;
const STAGE_CANDIDATE_FLOOR: usize = 20;

/// Read-only hybrid index over the product corpus.
///
/// Safe to share across concurrent queries; all state is immutable after
/// `build`.
pub struct HybridRetriever {
    corpus: Corpus,
    lexical: LexicalIndex,
    chunk_embeddings: Vec<Vec<f32>>,
    embedder: Arc<dyn Embedder>,
    weights: FusionWeights,
    top_k: usize,
}

impl HybridRetriever {
    /// Builds both stage indexes, embedding every chunk up front.
    pub async fn build(
        corpus: Corpus,
        embedder: Arc<dyn Embedder>,
        config: &RetrievalConfig,
    ) -> Result<Self> {
        let lexical = LexicalIndex::build(&corpus);
        let mut chunk_embeddings = Vec::with_capacity(corpus.len());
        for chunk in corpus.chunks() {
            chunk_embeddings.push(embedder.embed(&chunk.text).await?);
        }
        debug!(chunks = corpus.len(), "hybrid index built");
        Ok(Self {
            corpus,
            lexical,
            chunk_embeddings,
            embedder,
            weights: FusionWeights {
                lexical: config.lexical_weight,
                semantic: config.semantic_weight,
            },
            top_k: config.top_k,
        })
    }

    /// Runs both stages and returns the fused, de-duplicated top-k.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedPassage>> {
        if self.corpus.is_empty() {
            return Ok(Vec::new());
        }
        let stage_limit = (self.top_k * STAGE_CANDIDATE_FACTOR).max(STAGE_CANDIDATE_FLOOR);

        // Lexical stage over the full corpus.
        let mut lexical_hits = self.lexical.search(query);
        lexical_hits.truncate(stage_limit);

        // Semantic stage: cosine against every precomputed chunk embedding.
        let query_embedding = self.embedder.embed(query).await?;
        let mut semantic_hits: Vec<(usize, f32)> = self
            .chunk_embeddings
            .iter()
            .enumerate()
            .map(|(index, embedding)| (index, cosine_similarity(&query_embedding, embedding)))
            .collect();
        semantic_hits.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        semantic_hits.truncate(stage_limit);

        // De-duplicate: one candidate per chunk, both raw scores merged.
        // A chunk seen by only one stage scores 0.0 raw in the other.
        let mut merged: std::collections::BTreeMap<usize, (f32, f32)> =
            std::collections::BTreeMap::new();
        for hit in &lexical_hits {
            merged.entry(hit.chunk_index).or_insert((0.0, 0.0)).0 = hit.score;
        }
        for (index, score) in &semantic_hits {
            merged.entry(*index).or_insert((0.0, 0.0)).1 = *score;
        }

        let candidates: Vec<FusionCandidate> = merged
            .into_iter()
            .map(|(index, (lexical_score, semantic_score))| {
                let chunk = &self.corpus.chunks()[index];
                FusionCandidate {
                    document_id: chunk.id.clone(),
                    text: chunk.text.clone(),
                    lexical_score,
                    semantic_score,
                }
            })
            .collect();

        debug!(
            candidates = candidates.len(),
            top_k = self.top_k,
            "fusing retrieval stages"
        );
        Ok(fuse(candidates, self.weights, self.top_k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashEmbedder;
    use std::collections::HashSet;

    fn config(top_k: usize) -> RetrievalConfig {
        RetrievalConfig {
            top_k,
            ..RetrievalConfig::default()
        }
    }

    async fn retriever(top_k: usize) -> HybridRetriever {
        let corpus = Corpus::from_documents(
            vec![
                (
                    "chips".into(),
                    "Hot Chips by Frito-Lay, UPC 028400433303. Spicy crunchy snack.".into(),
                ),
                (
                    "cereal".into(),
                    "Morning Oats cereal with whole grain, gluten free breakfast.".into(),
                ),
                (
                    "soda".into(),
                    "Fizzy Cola soda, a sweetened carbonated beverage.".into(),
                ),
            ],
            750,
            100,
        );
        HybridRetriever::build(corpus, Arc::new(HashEmbedder::default()), &config(top_k))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn upc_query_ranks_the_exact_product_first() {
        let retriever = retriever(3).await;
        let passages = retriever.retrieve("nutrition for UPC 028400433303").await.unwrap();
        assert_eq!(passages[0].document_id, "chips#0");
    }

    #[tokio::test]
    async fn document_ids_are_unique_in_one_result_set() {
        let retriever = retriever(5).await;
        let passages = retriever.retrieve("snack cereal soda chips").await.unwrap();
        let ids: HashSet<&str> = passages.iter().map(|p| p.document_id.as_str()).collect();
        assert_eq!(ids.len(), passages.len());
    }

    #[tokio::test]
    async fn top_k_bounds_the_result_count() {
        let retriever = retriever(2).await;
        let passages = retriever.retrieve("food snack beverage").await.unwrap();
        assert!(passages.len() <= 2);
    }

    #[tokio::test]
    async fn combined_scores_are_sorted_descending() {
        let retriever = retriever(5).await;
        let passages = retriever.retrieve("gluten free cereal").await.unwrap();
        assert!(!passages.is_empty());
        for pair in passages.windows(2) {
            assert!(pair[0].combined_score >= pair[1].combined_score);
        }
    }

    #[tokio::test]
    async fn empty_corpus_returns_no_passages() {
        let corpus = Corpus::from_documents(vec![], 750, 100);
        let retriever =
            HybridRetriever::build(corpus, Arc::new(HashEmbedder::default()), &config(5))
                .await
                .unwrap();
        assert!(retriever.retrieve("anything").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn retrieval_is_deterministic() {
        let retriever = retriever(5).await;
        let first = retriever.retrieve("crunchy snack").await.unwrap();
        let second = retriever.retrieve("crunchy snack").await.unwrap();
        assert_eq!(first, second);
    }
}
