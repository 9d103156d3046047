//! Embedded résumé index.
//!
//! Holds every chunk with its vector and answers nearest-neighbor queries by
//! cosine similarity. Built once, then read-only and shared. Persisted as
//! JSON so a restart loads instead of re-embedding.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::RetrievalError;
use crate::llm::Embedder;
use crate::retrieval::loader::load_document;
use crate::retrieval::splitter::split_text;

/// One fragment of source text plus its locator — the unit returned by a
/// similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalChunk {
    pub text: String,
    pub source_locator: String,
}

/// A chunk with its embedding, as stored in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexedChunk {
    chunk: RetrievalChunk,
    vector: Vec<f32>,
}

/// Read-only semantic index over the résumé.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResumeIndex {
    chunks: Vec<IndexedChunk>,
    dimensions: usize,
}

impl ResumeIndex {
    /// Build the index from the source document: extract, split, embed.
    pub async fn build(
        source_path: &Path,
        embedder: &dyn Embedder,
        config: &PipelineConfig,
    ) -> Result<Self, RetrievalError> {
        let pages = load_document(source_path)?;

        let mut chunks = Vec::new();
        for page in &pages {
            for text in split_text(&page.text, config.chunk_size, config.chunk_overlap) {
                chunks.push(RetrievalChunk {
                    text,
                    source_locator: format!("page {}", page.number),
                });
            }
        }

        info!(
            pages = pages.len(),
            chunks = chunks.len(),
            "Resume split for indexing"
        );

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| RetrievalError::EmbeddingFailed {
                reason: e.to_string(),
            })?;

        Ok(Self {
            chunks: chunks
                .into_iter()
                .zip(vectors)
                .map(|(chunk, vector)| IndexedChunk { chunk, vector })
                .collect(),
            dimensions: embedder.dimensions(),
        })
    }

    /// Load a previously built index if one exists, otherwise build from the
    /// source document and persist. A missing source document is fatal.
    pub async fn build_or_load(
        source_path: &Path,
        index_path: &Path,
        embedder: &dyn Embedder,
        config: &PipelineConfig,
    ) -> Result<Self, RetrievalError> {
        if index_path.exists() {
            info!(path = %index_path.display(), "Loading existing resume index");
            return Self::load(index_path).await;
        }

        info!(path = %source_path.display(), "Indexing resume");
        let index = Self::build(source_path, embedder, config).await?;
        index.save(index_path).await?;
        info!(
            path = %index_path.display(),
            chunks = index.len(),
            "Resume index saved"
        );
        Ok(index)
    }

    /// Persist the index as JSON.
    pub async fn save(&self, path: &Path) -> Result<(), RetrievalError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_string(self)
            .map_err(|e| RetrievalError::IndexCorrupt(e.to_string()))?;
        tokio::fs::write(path, data).await?;
        Ok(())
    }

    /// Load a persisted index.
    pub async fn load(path: &Path) -> Result<Self, RetrievalError> {
        let data = tokio::fs::read_to_string(path).await?;
        serde_json::from_str(&data).map_err(|e| RetrievalError::IndexCorrupt(e.to_string()))
    }

    /// Nearest chunks to `query_vector`, ranked by cosine similarity
    /// descending. An empty result is a valid "no match", not a failure.
    pub fn search(&self, query_vector: &[f32], k: usize) -> Vec<(RetrievalChunk, f32)> {
        let mut scored: Vec<(RetrievalChunk, f32)> = self
            .chunks
            .iter()
            .filter(|c| c.vector.len() == query_vector.len())
            .map(|c| (c.chunk.clone(), cosine_similarity(&c.vector, query_vector)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Cosine similarity of two equal-length vectors; 0.0 when either is zero.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Assemble an index directly from chunk/vector pairs.
    pub fn index_from_parts(parts: Vec<(RetrievalChunk, Vec<f32>)>, dimensions: usize) -> ResumeIndex {
        ResumeIndex {
            chunks: parts
                .into_iter()
                .map(|(chunk, vector)| IndexedChunk { chunk, vector })
                .collect(),
            dimensions,
        }
    }

    pub fn chunk(text: &str, locator: &str) -> RetrievalChunk {
        RetrievalChunk {
            text: text.to_string(),
            source_locator: locator.to_string(),
        }
    }
}
