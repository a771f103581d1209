use serde_json::{Value, json};

use super::ToolHandlers;
use crate::error::{OperationContext, VectorDbResult};
use crate::models::{Document, WriteStats};

fn write_result(stats: WriteStats) -> Value {
    let message = match stats.documents_written {
        1 => "Wrote 1 document".to_string(),
        n => format!("Wrote {} documents", n),
    };
    json!({
        "status": "ok",
        "message": message,
        "write_stats": stats,
    })
}

impl ToolHandlers {
    pub(super) async fn write_document(&self, db_name: &str, document: Document) -> VectorDbResult<Value> {
        let db = self.instance(db_name).await?;
        let stats = db
            .write_document(document)
            .await
            .in_operation("write_document", db_name)?;
        Ok(write_result(stats))
    }

    pub(super) async fn write_documents(
        &self,
        db_name: &str,
        documents: Vec<Document>,
    ) -> VectorDbResult<Value> {
        let db = self.instance(db_name).await?;
        let stats = db
            .write_documents(documents)
            .await
            .in_operation("write_documents", db_name)?;
        Ok(write_result(stats))
    }

    pub(super) async fn query(
        &self,
        db_name: &str,
        query: &str,
        limit: usize,
        collection: Option<String>,
    ) -> VectorDbResult<Value> {
        let db = self.instance(db_name).await?;
        let summary = db
            .query(query, limit, collection)
            .await
            .in_operation("query", db_name)?;
        Ok(json!(summary))
    }

    pub(super) async fn search(
        &self,
        db_name: &str,
        query: &str,
        limit: usize,
        collection: Option<String>,
    ) -> VectorDbResult<Value> {
        let db = self.instance(db_name).await?;
        let results = db
            .search(query, limit, collection)
            .await
            .in_operation("search", db_name)?;
        Ok(json!({
            "count": results.len(),
            "results": results,
        }))
    }

    pub(super) async fn list_documents(
        &self,
        db_name: &str,
        limit: usize,
        offset: usize,
    ) -> VectorDbResult<Value> {
        let db = self.instance(db_name).await?;
        let documents = db
            .list_documents(limit, offset)
            .await
            .in_operation("list_documents", db_name)?;
        Ok(json!({
            "count": documents.len(),
            "documents": documents,
        }))
    }

    pub(super) async fn count_documents(&self, db_name: &str) -> VectorDbResult<Value> {
        let db = self.instance(db_name).await?;
        let count = db
            .count_documents()
            .await
            .in_operation("count_documents", db_name)?;
        Ok(json!({ "count": count }))
    }

    pub(super) async fn delete_document(&self, db_name: &str, document_id: &str) -> VectorDbResult<Value> {
        let db = self.instance(db_name).await?;
        db.delete_document(document_id)
            .await
            .in_operation("delete_document", db_name)?;
        Ok(json!(format!(
            "Successfully deleted document '{}' from vector database '{}'",
            document_id, db_name
        )))
    }

    pub(super) async fn delete_documents(
        &self,
        db_name: &str,
        document_ids: Vec<String>,
    ) -> VectorDbResult<Value> {
        let db = self.instance(db_name).await?;
        let deleted = db
            .delete_documents(document_ids)
            .await
            .in_operation("delete_documents", db_name)?;
        Ok(json!(format!(
            "Successfully deleted {} documents from vector database '{}'",
            deleted, db_name
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::database::MockVectorDatabase;
    use crate::error::{ErrorKind, VectorDbError};
    use crate::handlers::tests::handlers;
    use crate::models::BackendKind;
    use crate::registry::InstanceHandle;
    use crate::tools::ToolRequest;

    async fn with_mock_db() -> ToolHandlers {
        let handlers = handlers();
        handlers
            .handle(ToolRequest::CreateDatabase {
                db_name: "db1".into(),
                kind: BackendKind::Mock,
                collection: "Docs".into(),
            })
            .await
            .unwrap();
        handlers
    }

    fn doc(text: &str) -> Document {
        Document::new(format!("https://example.com/{}", text.len()), text)
    }

    #[tokio::test]
    async fn test_write_single_and_batch_messages() {
        let handlers = with_mock_db().await;

        let single = handlers
            .handle(ToolRequest::WriteDocument {
                db_name: "db1".into(),
                document: doc("rust ownership"),
            })
            .await
            .unwrap();
        assert_eq!(single["status"], "ok");
        assert_eq!(single["message"], "Wrote 1 document");
        assert_eq!(single["write_stats"]["documents_written"], 1);

        let batch = handlers
            .handle(ToolRequest::WriteDocuments {
                db_name: "db1".into(),
                documents: vec![doc("tokio runtime"), doc("axum router")],
            })
            .await
            .unwrap();
        assert_eq!(batch["message"], "Wrote 2 documents");
        assert_eq!(batch["write_stats"]["document_ids"].as_array().unwrap().len(), 2);

        let count = handlers
            .handle(ToolRequest::CountDocuments {
                db_name: "db1".into(),
            })
            .await
            .unwrap();
        assert_eq!(count, json!({"count": 3}));
    }

    #[tokio::test]
    async fn test_search_and_query_shapes() {
        let handlers = with_mock_db().await;
        handlers
            .handle(ToolRequest::WriteDocuments {
                db_name: "db1".into(),
                documents: vec![doc("rust async runtime"), doc("gardening tips")],
            })
            .await
            .unwrap();

        let search = handlers
            .handle(ToolRequest::Search {
                db_name: "db1".into(),
                query: "rust runtime".into(),
                limit: 1,
                collection: None,
            })
            .await
            .unwrap();
        assert_eq!(search["count"], 1);
        assert_eq!(search["results"][0]["document"]["text"], "rust async runtime");

        let query = handlers
            .handle(ToolRequest::Query {
                db_name: "db1".into(),
                query: "rust runtime".into(),
                limit: 5,
                collection: None,
            })
            .await
            .unwrap();
        assert!(query.as_str().unwrap().starts_with("Found"));
    }

    #[tokio::test]
    async fn test_list_documents_offset_past_end() {
        let handlers = with_mock_db().await;
        handlers
            .handle(ToolRequest::WriteDocument {
                db_name: "db1".into(),
                document: doc("only one"),
            })
            .await
            .unwrap();

        let page = handlers
            .handle(ToolRequest::ListDocuments {
                db_name: "db1".into(),
                limit: 10,
                offset: 5,
            })
            .await
            .unwrap();
        assert_eq!(page, json!({"documents": [], "count": 0}));
    }

    #[tokio::test]
    async fn test_delete_unknown_document_is_not_found() {
        let handlers = with_mock_db().await;

        let err = handlers
            .handle(ToolRequest::DeleteDocument {
                db_name: "db1".into(),
                document_id: "missing".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("document 'missing' not found"));
    }

    #[tokio::test]
    async fn test_delete_documents_reports_count() {
        let handlers = with_mock_db().await;
        let written = handlers
            .handle(ToolRequest::WriteDocuments {
                db_name: "db1".into(),
                documents: vec![doc("a"), doc("bb")],
            })
            .await
            .unwrap();
        let ids: Vec<String> = serde_json::from_value(written["write_stats"]["document_ids"].clone()).unwrap();

        let result = handlers
            .handle(ToolRequest::DeleteDocuments {
                db_name: "db1".into(),
                document_ids: ids,
            })
            .await
            .unwrap();
        assert_eq!(result, "Successfully deleted 2 documents from vector database 'db1'");
    }

    #[tokio::test]
    async fn test_backend_failure_keeps_message_and_context() {
        let handlers = handlers();

        let mut db = MockVectorDatabase::new();
        db.expect_kind().return_const(BackendKind::Milvus);
        db.expect_search()
            .returning(|_, _, _| Err(VectorDbError::backend("collection not loaded")));
        let db: InstanceHandle = Arc::new(db);
        handlers
            .instances()
            .create("remote", || async move { Ok(db) })
            .await
            .unwrap();

        let err = handlers
            .handle(ToolRequest::Search {
                db_name: "remote".into(),
                query: "q".into(),
                limit: 3,
                collection: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackendFailure);
        assert_eq!(
            err.to_string(),
            "search failed for vector database 'remote': collection not loaded"
        );
    }

    #[test]
    fn test_write_result_hides_empty_errors() {
        let stats = WriteStats::new(vec!["a".into()], vec![], std::time::Duration::from_millis(3));
        let result = write_result(stats);
        assert!(result["write_stats"].get("errors").is_none());
    }
}
