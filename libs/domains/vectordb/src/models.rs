use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::VectorDbError;

/// Collection used when `create_vector_database` is called without one.
pub const DEFAULT_COLLECTION: &str = "MaestroDocs";

/// Embedding name meaning "use the configured default model".
pub const DEFAULT_EMBEDDING: &str = "default";

/// Free-form document metadata.
pub type Metadata = Map<String, Value>;

/// Supported vector database backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Milvus,
    Weaviate,
    /// In-process store, no external service required
    Mock,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [BackendKind::Milvus, BackendKind::Weaviate, BackendKind::Mock];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Milvus => "milvus",
            BackendKind::Weaviate => "weaviate",
            BackendKind::Mock => "mock",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = VectorDbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "milvus" => Ok(BackendKind::Milvus),
            "weaviate" => Ok(BackendKind::Weaviate),
            "mock" => Ok(BackendKind::Mock),
            _ => Err(VectorDbError::UnsupportedBackend(s.to_string())),
        }
    }
}

/// A stored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Assigned by the backend on write when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub url: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

impl Document {
    pub fn new(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: None,
            url: url.into(),
            text: text.into(),
            metadata: Metadata::new(),
            vector: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_vector(mut self, vector: Vec<f32>) -> Self {
        self.vector = Some(vector);
        self
    }
}

/// A search hit with its similarity score (higher is closer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub document: Document,
    pub score: f32,
}

impl SearchResult {
    /// Sort in non-increasing score order. Ties keep their original order.
    pub fn sort_descending(results: &mut [SearchResult]) {
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
    }
}

/// Outcome of a bulk write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteStats {
    pub documents_written: usize,
    pub processing_time: String,
    #[serde(default)]
    pub document_ids: Vec<String>,
    /// Soft per-document failures that did not abort the batch
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl WriteStats {
    pub fn new(document_ids: Vec<String>, errors: Vec<String>, elapsed: Duration) -> Self {
        Self {
            documents_written: document_ids.len(),
            processing_time: format!("{:?}", elapsed),
            document_ids,
            errors,
        }
    }
}

/// Embedding generation result
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingResult {
    pub values: Vec<f32>,
    pub dimension: u32,
    pub tokens_used: u32,
}

/// One row of `list_databases`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: BackendKind,
    pub collection: String,
    /// `-1` when the backend could not be counted
    pub document_count: i64,
}
