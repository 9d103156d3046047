//! Context retriever — the query modes the pipeline consumes.
//!
//! Splitting retrieval into "always-applicable identity facts" and
//! "query-specific facts" keeps the generator from ever claiming ignorance
//! of the candidate's name or title: short employer messages rarely mention
//! the candidate, so pure top-k search on the message alone can miss the
//! identity chunks entirely.

use std::sync::Arc;

use tracing::debug;

use crate::error::RetrievalError;
use crate::llm::Embedder;
use crate::retrieval::index::{ResumeIndex, RetrievalChunk};

/// Fixed broad queries for identity facts (name, contact, title).
const IDENTITY_QUERIES: &[&str] = &[
    "name full name contact email phone",
    "title position role summary",
];

/// Fixed broad queries for the CV summary used by the intake gate.
const SUMMARY_QUERIES: &[&str] = &[
    "skills experience education",
    "projects achievements work history",
    "contact information name title",
];

/// Results fetched per broad query.
const BROAD_QUERY_K: usize = 2;

/// Chunk caps after deduplication.
const IDENTITY_CHUNK_CAP: usize = 4;
const SUMMARY_CHUNK_CAP: usize = 8;

/// Rendered in place of topic context when no chunk matches. A valid
/// outcome, distinct from a lookup failure.
pub const NO_MATCH_CONTEXT: &str = "No matching resume information found.";

/// Retrieved context for one generation call. Recomputed per call — topic
/// retrieval depends on the message, so bundles are never reused across runs.
#[derive(Debug, Clone)]
pub struct ContextBundle {
    pub identity_context: String,
    pub topic_context: String,
}

/// Read-only retrieval service over the résumé index.
///
/// Constructed once at process start and shared by `Arc`; the index is never
/// written after construction.
pub struct ContextRetriever {
    index: ResumeIndex,
    embedder: Arc<dyn Embedder>,
    topic_top_k: usize,
}

impl ContextRetriever {
    pub fn new(index: ResumeIndex, embedder: Arc<dyn Embedder>, topic_top_k: usize) -> Self {
        Self {
            index,
            embedder,
            topic_top_k,
        }
    }

    /// Nearest chunks for a free-form query, ranked by similarity
    /// descending. An empty vec means "no match" — not an error.
    pub async fn query_topic(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievalChunk>, RetrievalError> {
        let vector = self.embed(query).await?;
        let results = self.index.search(&vector, k);
        debug!(query_len = query.len(), hits = results.len(), "Topic query");
        Ok(results.into_iter().map(|(chunk, _)| chunk).collect())
    }

    /// Identity facts: two fixed broad queries, first-seen-order dedup,
    /// capped at four chunks. The ordered dedup makes which chunks survive
    /// the cap deterministic across calls.
    pub async fn query_identity(&self) -> Result<String, RetrievalError> {
        self.broad_query(IDENTITY_QUERIES, IDENTITY_CHUNK_CAP).await
    }

    /// Broad CV summary for the intake gate: three fixed queries, same
    /// dedup policy, capped at eight chunks.
    pub async fn query_summary(&self) -> Result<String, RetrievalError> {
        self.broad_query(SUMMARY_QUERIES, SUMMARY_CHUNK_CAP).await
    }

    /// Full context bundle for one generation call.
    pub async fn bundle_for(&self, message: &str) -> Result<ContextBundle, RetrievalError> {
        let identity_context = self.query_identity().await?;
        let topic_chunks = self.query_topic(message, self.topic_top_k).await?;
        Ok(ContextBundle {
            identity_context,
            topic_context: render_topic_context(&topic_chunks),
        })
    }

    async fn broad_query(&self, queries: &[&str], cap: usize) -> Result<String, RetrievalError> {
        let mut seen = std::collections::HashSet::new();
        let mut kept: Vec<String> = Vec::new();

        for query in queries {
            let vector = self.embed(query).await?;
            for (chunk, _) in self.index.search(&vector, BROAD_QUERY_K) {
                if seen.insert(chunk.text.clone()) {
                    kept.push(chunk.text);
                }
            }
        }

        kept.truncate(cap);
        Ok(kept.join("\n\n"))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        self.embedder
            .embed(text)
            .await
            .map_err(|e| RetrievalError::EmbeddingFailed {
                reason: e.to_string(),
            })
    }
}

/// Render topic chunks with their locators, or the no-match sentinel.
pub fn render_topic_context(chunks: &[RetrievalChunk]) -> String {
    if chunks.is_empty() {
        return NO_MATCH_CONTEXT.to_string();
    }
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            format!(
                "[CV Section {} — {}]\n{}",
                i + 1,
                chunk.source_locator,
                chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}


#[cfg(test)]
mod tests {
    use super::test_support::{keyword_vector, KeywordEmbedder};
    use super::*;
    use crate::retrieval::index::test_support::{chunk, index_from_parts};

    fn retriever_with(texts: &[(&str, &str)]) -> ContextRetriever {
        let parts = texts
            .iter()
            .map(|(text, locator)| (chunk(text, locator), keyword_vector(text)))
            .collect();
        ContextRetriever::new(
            index_from_parts(parts, 6),
            std::sync::Arc::new(KeywordEmbedder),
            3,
        )
    }

    fn sample_retriever() -> ContextRetriever {
        retriever_with(&[
            ("Jane Doe — email jane@example.com, phone 555-0100", "page 1"),
            ("Senior Engineer. Summary: distributed systems role", "page 1"),
            ("Skills: Rust, Tokio. Education: BSc", "page 2"),
            ("Projects: search engine. Achievements: work history", "page 2"),
            ("Hobbies: gardening and cooking", "page 3"),
        ])
    }

    #[tokio::test]
    async fn query_topic_ranks_relevant_chunks() {
        let retriever = sample_retriever();
        let chunks = retriever
            .query_topic("What Rust experience and skills do you have?", 3)
            .await
            .unwrap();
        assert!(!chunks.is_empty());
        assert!(chunks[0].text.contains("Rust"));
    }

    #[tokio::test]
    async fn query_topic_no_overlap_is_empty_not_error() {
        let retriever = retriever_with(&[("Hobbies: gardening", "page 1")]);
        let chunks = retriever.query_topic("interview schedule", 3).await.unwrap();
        // Zero similarity everywhere still returns ranked chunks; the
        // empty-index case is the true no-match.
        assert!(chunks.len() <= 1);

        let empty = retriever_with(&[]);
        let chunks = empty.query_topic("interview schedule", 3).await.unwrap();
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn identity_context_contains_name_and_title_chunks() {
        let retriever = sample_retriever();
        let identity = retriever.query_identity().await.unwrap();
        assert!(identity.contains("jane@example.com"));
        assert!(identity.contains("Senior Engineer"));
    }

    #[tokio::test]
    async fn identity_dedup_is_ordered_and_capped() {
        // One chunk dominates both identity queries; it must appear once,
        // and first (first-seen order survives the cap).
        let retriever = retriever_with(&[
            ("Jane Doe name email phone contact title role summary", "page 1"),
            ("Hobbies: gardening", "page 3"),
        ]);
        let identity = retriever.query_identity().await.unwrap();
        assert_eq!(identity.matches("Jane Doe").count(), 1);
        assert!(identity.starts_with("Jane Doe"));
        assert!(identity.split("\n\n").count() <= 4);
    }

    #[tokio::test]
    async fn summary_is_capped_at_eight() {
        let texts: Vec<String> = (0..12)
            .map(|i| format!("skills experience education projects work chunk {i}"))
            .collect();
        let pairs: Vec<(&str, &str)> = texts.iter().map(|t| (t.as_str(), "page 1")).collect();
        let retriever = retriever_with(&pairs);

        let summary = retriever.query_summary().await.unwrap();
        assert!(summary.split("\n\n").count() <= 8);
    }

    #[tokio::test]
    async fn bundle_has_both_contexts() {
        let retriever = sample_retriever();
        let bundle = retriever
            .bundle_for("Do you have Rust skills?")
            .await
            .unwrap();
        assert!(bundle.identity_context.contains("Jane"));
        assert!(bundle.topic_context.contains("Rust"));
        assert!(bundle.topic_context.contains("CV Section 1"));
    }

    #[test]
    fn render_empty_topic_is_sentinel() {
        assert_eq!(render_topic_context(&[]), NO_MATCH_CONTEXT);
    }

    #[test]
    fn render_topic_cites_locators() {
        let chunks = vec![chunk("Skills: Rust", "page 2")];
        let rendered = render_topic_context(&chunks);
        assert!(rendered.contains("[CV Section 1 — page 2]"));
        assert!(rendered.contains("Skills: Rust"));
    }
}
