//! Product document corpus.
//!
//! The corpus is a directory of pre-generated `.txt` product documents,
//! split into overlapping character chunks at index-build time. Chunk ids
//! are `<file-stem>#<ordinal>`, stable across rebuilds of the same input.

use std::path::Path;

use pantry_core::error::{PantryError, Result};

/// One indexable chunk of a source document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    pub id: String,
    pub text: String,
}

/// The read-only chunk collection both retrieval stages index.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    chunks: Vec<DocumentChunk>,
}

impl Corpus {
    /// Loads every `.txt` file under `dir` and chunks it.
    pub fn load_dir(dir: impl AsRef<Path>, chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        let dir = dir.as_ref();
        let mut documents = Vec::new();
        let entries = std::fs::read_dir(dir).map_err(|err| {
            PantryError::io(format!("cannot read corpus dir {}: {err}", dir.display()))
        })?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("document")
                .to_string();
            let text = std::fs::read_to_string(&path)?;
            documents.push((stem, text));
        }
        // Directory iteration order is platform-dependent; chunk ids must not be.
        documents.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(Self::from_documents(documents, chunk_size, chunk_overlap))
    }

    /// Builds a corpus from in-memory (name, text) documents.
    pub fn from_documents(
        documents: Vec<(String, String)>,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Self {
        let mut chunks = Vec::new();
        for (name, text) in documents {
            for (ordinal, chunk) in split_chunks(&text, chunk_size, chunk_overlap)
                .into_iter()
                .enumerate()
            {
                chunks.push(DocumentChunk {
                    id: format!("{name}#{ordinal}"),
                    text: chunk,
                });
            }
        }
        Self { chunks }
    }

    pub fn chunks(&self) -> &[DocumentChunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Splits text into character windows of `size` advancing by `size - overlap`.
///
/// The overlap is clamped below the chunk size so the window always advances.
fn split_chunks(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    let size = size.max(1);
    let step = size.saturating_sub(overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        if !chunk.trim().is_empty() {
            chunks.push(chunk);
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}
