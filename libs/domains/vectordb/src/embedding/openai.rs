use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_optional, env_or_default, env_required};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::EmbeddingProvider;
use crate::error::{VectorDbError, VectorDbResult};
use crate::models::EmbeddingResult;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI embedding provider configuration
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub base_url: String,
    /// Requested output size, only honoured by `text-embedding-3-*` models
    pub dimensions: Option<u32>,
}

impl OpenAIConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            dimensions: None,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_dimensions(mut self, dimensions: u32) -> Self {
        self.dimensions = Some(dimensions);
        self
    }
}

impl FromEnv for OpenAIConfig {
    /// Requires `OPENAI_API_KEY`; `OPENAI_BASE_URL` defaults to the public API.
    fn from_env() -> Result<Self, ConfigError> {
        let api_key = env_required("OPENAI_API_KEY")?;
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()));
        }
        let base_url = env_or_default("OPENAI_BASE_URL", DEFAULT_BASE_URL);
        let dimensions = env_optional("OPENAI_EMBEDDING_DIMENSIONS")
            .map(|raw| {
                raw.parse().map_err(|e: std::num::ParseIntError| ConfigError::ParseError {
                    key: "OPENAI_EMBEDDING_DIMENSIONS".to_string(),
                    details: e.to_string(),
                })
            })
            .transpose()?;

        Ok(Self {
            api_key,
            base_url,
            dimensions,
        })
    }
}

/// OpenAI embeddings provider
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(OpenAIConfig::from_env()?))
    }

    fn dimensions_for(&self, model: &str) -> Option<u32> {
        self.config
            .dimensions
            .filter(|_| model.starts_with("text-embedding-3"))
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    usage: EmbeddingUsage,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Default, Deserialize)]
struct EmbeddingUsage {
    #[serde(default)]
    total_tokens: u32,
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn embed(&self, model: &str, text: &str) -> VectorDbResult<EmbeddingResult> {
        let results = self.embed_batch(model, &[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| VectorDbError::Embedding("No embedding returned".to_string()))
    }

    async fn embed_batch(
        &self,
        model: &str,
        texts: &[String],
    ) -> VectorDbResult<Vec<EmbeddingResult>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let request = EmbeddingRequest {
            model,
            input: texts,
            dimensions: self.dimensions_for(model),
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.config.base_url.trim_end_matches('/')))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| VectorDbError::Embedding(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(VectorDbError::Embedding(format!(
                "OpenAI API error ({}): {}",
                status, error_text
            )));
        }

        let embedding_response: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| VectorDbError::Embedding(e.to_string()))?;

        if embedding_response.data.len() != texts.len() {
            return Err(VectorDbError::Embedding(format!(
                "OpenAI returned {} embeddings for {} inputs",
                embedding_response.data.len(),
                texts.len()
            )));
        }

        // Sort by index to maintain order
        let mut data = embedding_response.data;
        data.sort_by_key(|d| d.index);

        let tokens_per_embedding = embedding_response.usage.total_tokens / texts.len() as u32;

        Ok(data
            .into_iter()
            .map(|d| EmbeddingResult {
                dimension: d.embedding.len() as u32,
                values: d.embedding,
                tokens_used: tokens_per_embedding,
            })
            .collect())
    }
}
