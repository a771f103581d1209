mod embedder;
mod openai;
mod provider;

pub use embedder::Embedder;
pub use openai::{OpenAIConfig, OpenAIProvider};
pub use provider::EmbeddingProvider;

#[cfg(test)]
pub use provider::MockEmbeddingProvider;

use core_config::{ConfigError, FromEnv, env_or_default, env_parse_or};

/// Embedding defaults shared by the remote backends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingConfig {
    /// Model used when `setup_database` is called with the `default` embedding
    pub model: String,
    /// Vector width of newly created collections
    pub vector_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-ada-002".to_string(),
            vector_size: 1536,
        }
    }
}

impl FromEnv for EmbeddingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let model = env_or_default("EMBEDDING_MODEL", &defaults.model);
        let vector_size = env_parse_or("EMBEDDING_VECTOR_SIZE", defaults.vector_size)?;

        if vector_size == 0 {
            return Err(ConfigError::ParseError {
                key: "EMBEDDING_VECTOR_SIZE".to_string(),
                details: "vector size must be positive".to_string(),
            });
        }

        Ok(Self { model, vector_size })
    }
}
