use async_trait::async_trait;

use crate::error::VectorDbResult;
use crate::models::EmbeddingResult;

/// Trait for embedding generation providers
///
/// Remote backends use a provider to vectorise documents and queries that
/// arrive as plain text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &'static str;

    /// Generate embedding for a single text
    async fn embed(&self, model: &str, text: &str) -> VectorDbResult<EmbeddingResult>;

    /// Generate embeddings for multiple texts in batch, preserving input order
    async fn embed_batch(&self, model: &str, texts: &[String])
        -> VectorDbResult<Vec<EmbeddingResult>>;
}
