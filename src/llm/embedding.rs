//! Embedding seam, mirrored on the completion provider seam.

use std::time::Duration;

use async_trait::async_trait;
use rig::embeddings::EmbeddingModel as RigEmbeddingModel;

use crate::error::LlmError;

/// Default bound on a single embedding call.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Embedding provider abstraction.
///
/// The retriever stores f32 vectors; adapters narrow from the backend's
/// native width.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Dimensionality of the vectors this embedder produces.
    fn dimensions(&self) -> usize;

    /// Embed one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError>;

    /// Embed a batch of texts, preserving order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError>;
}

/// Adapter wrapping a rig embedding model.
pub struct RigEmbedder<E> {
    model: E,
    model_name: String,
    timeout: Duration,
}

impl<E> RigEmbedder<E> {
    pub fn new(model: E, model_name: &str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl<E> Embedder for RigEmbedder<E>
where
    E: RigEmbeddingModel + Send + Sync,
{
    fn dimensions(&self) -> usize {
        self.model.ndims()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let batch = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        batch.into_iter().next().ok_or_else(|| LlmError::InvalidResponse {
            provider: self.model_name.clone(),
            reason: "embedding response was empty".into(),
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let embeddings = tokio::time::timeout(
            self.timeout,
            self.model.embed_texts(texts.to_vec()),
        )
        .await
        .map_err(|_| LlmError::Timeout {
            provider: self.model_name.clone(),
            timeout: self.timeout,
        })?
        .map_err(|e| LlmError::RequestFailed {
            provider: self.model_name.clone(),
            reason: e.to_string(),
        })?;

        if embeddings.len() != texts.len() {
            return Err(LlmError::InvalidResponse {
                provider: self.model_name.clone(),
                reason: format!(
                    "asked for {} embeddings, got {}",
                    texts.len(),
                    embeddings.len()
                ),
            });
        }

        Ok(embeddings
            .into_iter()
            .map(|e| e.vec.into_iter().map(|v| v as f32).collect())
            .collect())
    }
}
