use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use super::EmbeddingProvider;
use crate::error::{VectorDbError, VectorDbResult};
use crate::models::{DEFAULT_EMBEDDING, Document};

/// Per-instance embedding state: an optional provider plus the model chosen
/// at `setup` time.
pub struct Embedder {
    provider: Option<Arc<dyn EmbeddingProvider>>,
    default_model: String,
    model: RwLock<String>,
}

impl Embedder {
    pub fn new(provider: Option<Arc<dyn EmbeddingProvider>>, default_model: impl Into<String>) -> Self {
        let default_model = default_model.into();
        Self {
            provider,
            model: RwLock::new(default_model.clone()),
            default_model,
        }
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    /// Switch models. `default` restores the configured default.
    pub async fn select(&self, embedding: &str) {
        let model = if embedding.is_empty() || embedding == DEFAULT_EMBEDDING {
            self.default_model.clone()
        } else {
            embedding.to_string()
        };
        *self.model.write().await = model;
    }

    pub async fn model(&self) -> String {
        self.model.read().await.clone()
    }

    fn provider(&self) -> VectorDbResult<&Arc<dyn EmbeddingProvider>> {
        self.provider.as_ref().ok_or_else(|| {
            VectorDbError::Config(
                "no embedding provider configured; supply vectors explicitly or set OPENAI_API_KEY"
                    .to_string(),
            )
        })
    }

    /// Embed every document that has no vector yet, in a single batch.
    pub async fn fill_vectors(&self, documents: &mut [Document]) -> VectorDbResult<()> {
        let missing: Vec<usize> = documents
            .iter()
            .enumerate()
            .filter(|(_, doc)| doc.vector.is_none())
            .map(|(i, _)| i)
            .collect();

        if missing.is_empty() {
            return Ok(());
        }

        let provider = self.provider()?;
        let model = self.model().await;
        let texts: Vec<String> = missing.iter().map(|&i| documents[i].text.clone()).collect();

        debug!(provider = provider.name(), model = %model, count = texts.len(), "Embedding documents");
        let embeddings = provider.embed_batch(&model, &texts).await?;
        if embeddings.len() != missing.len() {
            return Err(VectorDbError::Embedding(format!(
                "expected {} embeddings, got {}",
                missing.len(),
                embeddings.len()
            )));
        }

        for (index, embedding) in missing.into_iter().zip(embeddings) {
            documents[index].vector = Some(embedding.values);
        }
        Ok(())
    }

    pub async fn embed_query(&self, text: &str) -> VectorDbResult<Vec<f32>> {
        let provider = self.provider()?;
        let model = self.model().await;
        Ok(provider.embed(&model, text).await?.values)
    }
}
