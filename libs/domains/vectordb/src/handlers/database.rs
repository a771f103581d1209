use futures::future::join_all;
use serde_json::{Value, json};
use tokio::time::timeout;
use tracing::warn;

use super::ToolHandlers;
use crate::error::{OperationContext, VectorDbResult};
use crate::models::{BackendKind, DatabaseSummary};

impl ToolHandlers {
    pub(super) async fn create_database(
        &self,
        db_name: &str,
        kind: BackendKind,
        collection: &str,
    ) -> VectorDbResult<Value> {
        let factory = &self.factory;
        let handle = self
            .instances
            .create(db_name, || async move { factory.create(kind, collection) })
            .await?;

        Ok(json!(format!(
            "Successfully created {} vector database '{}' with collection '{}'",
            kind,
            db_name,
            handle.collection_name()
        )))
    }

    pub(super) async fn list_databases(&self) -> VectorDbResult<Value> {
        let snapshot = self.instances.enumerate().await;
        if snapshot.is_empty() {
            return Ok(json!("No vector databases are currently active"));
        }

        // Counted from the snapshot, after the registry lock is released.
        let deadline = self.count_timeout;
        let databases = join_all(snapshot.into_iter().map(|(name, handle)| async move {
            let document_count = match timeout(deadline, handle.count_documents()).await {
                Ok(Ok(count)) => i64::try_from(count).unwrap_or(i64::MAX),
                Ok(Err(e)) => {
                    warn!(instance = %name, error = %e, "Failed to count documents");
                    -1
                }
                Err(_) => {
                    warn!(instance = %name, after = ?deadline, "Timed out counting documents");
                    -1
                }
            };
            DatabaseSummary {
                kind: handle.kind(),
                collection: handle.collection_name(),
                name,
                document_count,
            }
        }))
        .await;

        Ok(json!({ "databases": databases }))
    }

    pub(super) async fn setup_database(&self, db_name: &str, embedding: &str) -> VectorDbResult<Value> {
        let db = self.instance(db_name).await?;
        db.setup(embedding).await.in_operation("setup", db_name)?;

        Ok(json!(format!(
            "Successfully set up {} vector database '{}' with embedding '{}'",
            db.kind(),
            db_name,
            embedding
        )))
    }

    pub(super) async fn cleanup(&self, db_name: &str) -> VectorDbResult<Value> {
        self.instances
            .cleanup(db_name, |db| async move {
                db.cleanup().await.in_operation("cleanup", db_name)
            })
            .await?;

        Ok(json!(format!(
            "Successfully cleaned up and removed vector database '{}'",
            db_name
        )))
    }
}
