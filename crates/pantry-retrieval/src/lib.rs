//! Hybrid lexical + semantic retrieval over the product document corpus.

pub mod corpus;
pub mod embed;
pub mod fusion;
pub mod lexical;
pub mod retriever;

pub use corpus::Corpus;
pub use embed::{Embedder, HashEmbedder, HttpEmbedder};
pub use retriever::HybridRetriever;
