//! Tool handlers. Each takes a validated [`ToolRequest`] and returns the
//! JSON `result` payload.

mod collections;
mod database;
mod documents;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::config::McpConfig;
use crate::error::VectorDbResult;
use crate::factory::BackendFactory;
use crate::registry::{InstanceHandle, InstanceRegistry};
use crate::tools::ToolRequest;

/// Shared state the handlers operate on.
#[derive(Clone)]
pub struct ToolHandlers {
    instances: Arc<InstanceRegistry>,
    factory: BackendFactory,
    count_timeout: Duration,
}

impl ToolHandlers {
    pub fn new(instances: Arc<InstanceRegistry>, factory: BackendFactory) -> Self {
        Self {
            instances,
            factory,
            count_timeout: McpConfig::default().count_timeout(),
        }
    }

    /// Per-instance deadline for the counts reported by `list_databases`.
    pub fn with_count_timeout(mut self, timeout: Duration) -> Self {
        self.count_timeout = timeout;
        self
    }

    pub fn instances(&self) -> &Arc<InstanceRegistry> {
        &self.instances
    }

    pub async fn handle(&self, request: ToolRequest) -> VectorDbResult<Value> {
        match request {
            ToolRequest::CreateDatabase {
                db_name,
                kind,
                collection,
            } => self.create_database(&db_name, kind, &collection).await,
            ToolRequest::ListDatabases => self.list_databases().await,
            ToolRequest::SetupDatabase { db_name, embedding } => {
                self.setup_database(&db_name, &embedding).await
            }
            ToolRequest::Cleanup { db_name } => self.cleanup(&db_name).await,

            ToolRequest::WriteDocument { db_name, document } => {
                self.write_document(&db_name, document).await
            }
            ToolRequest::WriteDocuments { db_name, documents } => {
                self.write_documents(&db_name, documents).await
            }
            ToolRequest::Query {
                db_name,
                query,
                limit,
                collection,
            } => self.query(&db_name, &query, limit, collection).await,
            ToolRequest::Search {
                db_name,
                query,
                limit,
                collection,
            } => self.search(&db_name, &query, limit, collection).await,
            ToolRequest::ListDocuments {
                db_name,
                limit,
                offset,
            } => self.list_documents(&db_name, limit, offset).await,
            ToolRequest::CountDocuments { db_name } => self.count_documents(&db_name).await,
            ToolRequest::DeleteDocument {
                db_name,
                document_id,
            } => self.delete_document(&db_name, &document_id).await,
            ToolRequest::DeleteDocuments {
                db_name,
                document_ids,
            } => self.delete_documents(&db_name, document_ids).await,

            ToolRequest::ListCollections { db_name } => self.list_collections(&db_name).await,
            ToolRequest::GetCollectionInfo {
                db_name,
                collection,
            } => self.get_collection_info(&db_name, collection).await,
            ToolRequest::DeleteCollection {
                db_name,
                collection,
            } => self.delete_collection(&db_name, collection).await,
        }
    }

    async fn instance(&self, db_name: &str) -> VectorDbResult<InstanceHandle> {
        self.instances.get(db_name).await
    }
}
