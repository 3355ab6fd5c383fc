//! Lexical retrieval stage.
//!
//! IDF-weighted term-overlap scoring over the full corpus. This stage
//! exists so UPCs and exact product names match verbatim even when
//! embedding similarity is weak; the tokenizer therefore keeps digit runs
//! intact, and queries get their digit-normalized UPC candidates added as
//! extra terms.

use std::collections::{HashMap, HashSet};

use crate::corpus::Corpus;

/// A scored chunk from the lexical stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LexicalHit {
    /// Index into the corpus chunk list.
    pub chunk_index: usize,
    pub score: f32,
}

/// In-memory inverted term index over the corpus.
pub struct LexicalIndex {
    /// term -> set of chunk indices containing it
    postings: HashMap<String, HashSet<usize>>,
    chunk_count: usize,
}

impl LexicalIndex {
    pub fn build(corpus: &Corpus) -> Self {
        let mut postings: HashMap<String, HashSet<usize>> = HashMap::new();
        for (index, chunk) in corpus.chunks().iter().enumerate() {
            for term in tokenize(&chunk.text) {
                postings.entry(term).or_default().insert(index);
            }
        }
        Self {
            postings,
            chunk_count: corpus.len(),
        }
    }

    /// Scores every chunk containing at least one query term.
    ///
    /// Score is the sum of IDF over the distinct query terms present in
    /// the chunk. Results are sorted by score descending, chunk index
    /// ascending.
    pub fn search(&self, query: &str) -> Vec<LexicalHit> {
        let mut terms: HashSet<String> = tokenize(query).into_iter().collect();
        // Make formatted UPCs in the query match their verbatim corpus form.
        for candidate in pantry_core::upc::extract_candidates(query) {
            terms.insert(candidate);
        }

        let mut scores: HashMap<usize, f32> = HashMap::new();
        for term in &terms {
            if let Some(chunks) = self.postings.get(term) {
                let idf = self.idf(chunks.len());
                for &chunk_index in chunks {
                    *scores.entry(chunk_index).or_insert(0.0) += idf;
                }
            }
        }

        let mut hits: Vec<LexicalHit> = scores
            .into_iter()
            .map(|(chunk_index, score)| LexicalHit { chunk_index, score })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.chunk_index.cmp(&b.chunk_index))
        });
        hits
    }

    /// BM25-flavoured inverse document frequency.
    fn idf(&self, doc_frequency: usize) -> f32 {
        let n = self.chunk_count as f32;
        let df = doc_frequency as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }
}

/// Lowercased alphanumeric runs; digit runs survive whole.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            current.extend(ch.to_lowercase());
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
