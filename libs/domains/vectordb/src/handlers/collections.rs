use serde_json::{Value, json};

use super::ToolHandlers;
use crate::error::{OperationContext, VectorDbResult};

impl ToolHandlers {
    pub(super) async fn list_collections(&self, db_name: &str) -> VectorDbResult<Value> {
        let db = self.instance(db_name).await?;
        let collections = db
            .list_collections()
            .await
            .in_operation("list_collections", db_name)?;
        Ok(json!({ "collections": collections }))
    }

    pub(super) async fn get_collection_info(
        &self,
        db_name: &str,
        collection: Option<String>,
    ) -> VectorDbResult<Value> {
        let db = self.instance(db_name).await?;
        let info = db
            .get_collection_info(collection)
            .await
            .in_operation("get_collection_info", db_name)?;
        Ok(Value::Object(info))
    }

    pub(super) async fn delete_collection(
        &self,
        db_name: &str,
        collection: Option<String>,
    ) -> VectorDbResult<Value> {
        let db = self.instance(db_name).await?;
        let target = collection.clone().unwrap_or_else(|| db.collection_name());
        db.delete_collection(collection)
            .await
            .in_operation("delete_collection", db_name)?;
        Ok(json!(format!(
            "Successfully deleted collection '{}' from vector database '{}'",
            target, db_name
        )))
    }
}
