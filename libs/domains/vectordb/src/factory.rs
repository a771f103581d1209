use std::sync::Arc;

use core_config::{ConfigError, FromEnv};
use tracing::info;

use crate::backends::{InMemoryDatabase, MilvusConfig, MilvusDatabase, WeaviateConfig, WeaviateDatabase};
use crate::database::VectorDatabase;
use crate::embedding::{EmbeddingConfig, EmbeddingProvider};
use crate::error::VectorDbResult;
use crate::models::BackendKind;

/// Builds backend handles for `create_vector_database`.
///
/// Construction does no network I/O; remote backends connect lazily on
/// first use, so it is safe to call while the instance registry is locked.
#[derive(Clone, Default)]
pub struct BackendFactory {
    milvus: MilvusConfig,
    weaviate: WeaviateConfig,
    embedding: EmbeddingConfig,
    provider: Option<Arc<dyn EmbeddingProvider>>,
}

impl BackendFactory {
    pub fn new(milvus: MilvusConfig, weaviate: WeaviateConfig, embedding: EmbeddingConfig) -> Self {
        Self {
            milvus,
            weaviate,
            embedding,
            provider: None,
        }
    }

    pub fn with_embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn has_embedding_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn create(
        &self,
        kind: BackendKind,
        collection: &str,
    ) -> VectorDbResult<Arc<dyn VectorDatabase>> {
        let handle: Arc<dyn VectorDatabase> = match kind {
            BackendKind::Mock => Arc::new(InMemoryDatabase::new(collection)),
            BackendKind::Milvus => Arc::new(MilvusDatabase::new(
                self.milvus.clone(),
                &self.embedding,
                self.provider.clone(),
                collection,
            )?),
            BackendKind::Weaviate => Arc::new(WeaviateDatabase::new(
                self.weaviate.clone(),
                &self.embedding,
                self.provider.clone(),
                collection,
            )?),
        };

        info!(kind = %kind, collection = %handle.collection_name(), "Built vector database handle");
        Ok(handle)
    }
}

impl FromEnv for BackendFactory {
    /// Backend connection settings only; the embedding provider is attached
    /// separately because it is optional.
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(
            MilvusConfig::from_env()?,
            WeaviateConfig::from_env()?,
            EmbeddingConfig::from_env()?,
        ))
    }
}
