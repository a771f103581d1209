use async_trait::async_trait;

use crate::error::VectorDbResult;
use crate::models::{BackendKind, Document, Metadata, SearchResult, WriteStats};

/// Capability interface every vector database backend implements.
///
/// Handles are shared as `Arc<dyn VectorDatabase>` across concurrent
/// requests. Implementations own whatever internal locking they need.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorDatabase: Send + Sync {
    /// Backend kind this handle talks to
    fn kind(&self) -> BackendKind;

    /// Collection this instance writes into by default
    fn collection_name(&self) -> String;

    // ===== Lifecycle =====

    /// Provision backing storage. Succeeds without changes when it already exists.
    async fn setup(&self, embedding: &str) -> VectorDbResult<()>;

    /// Release backend resources. The instance is unusable afterwards.
    async fn cleanup(&self) -> VectorDbResult<()>;

    // ===== Documents =====

    /// Write a single document
    async fn write_document(&self, document: Document) -> VectorDbResult<WriteStats> {
        self.write_documents(vec![document]).await
    }

    /// Write a batch of documents
    async fn write_documents(&self, documents: Vec<Document>) -> VectorDbResult<WriteStats>;

    /// Similarity search, results in non-increasing score order
    async fn search(
        &self,
        query: &str,
        limit: usize,
        collection: Option<String>,
    ) -> VectorDbResult<Vec<SearchResult>>;

    /// Similarity search rendered as a human-readable summary
    async fn query(
        &self,
        query: &str,
        limit: usize,
        collection: Option<String>,
    ) -> VectorDbResult<String> {
        let results = self.search(query, limit, collection).await?;
        Ok(crate::backends::summarize(query, &results))
    }

    async fn list_documents(&self, limit: usize, offset: usize) -> VectorDbResult<Vec<Document>>;

    async fn count_documents(&self) -> VectorDbResult<u64>;

    async fn delete_document(&self, document_id: &str) -> VectorDbResult<()>;

    /// Delete several documents, returning how many were removed
    async fn delete_documents(&self, document_ids: Vec<String>) -> VectorDbResult<usize>;

    // ===== Collections =====

    async fn list_collections(&self) -> VectorDbResult<Vec<String>>;

    /// Describe a collection (defaults to this instance's own)
    async fn get_collection_info(&self, collection: Option<String>) -> VectorDbResult<Metadata>;

    /// Drop a collection (defaults to this instance's own)
    async fn delete_collection(&self, collection: Option<String>) -> VectorDbResult<()>;
}
