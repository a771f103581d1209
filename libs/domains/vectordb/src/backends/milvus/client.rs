use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};
use uuid::Uuid;

use super::MilvusConfig;
use crate::backends::{document_from_row, quote_filter_value};
use crate::database::VectorDatabase;
use crate::embedding::{Embedder, EmbeddingConfig, EmbeddingProvider};
use crate::error::{VectorDbError, VectorDbResult};
use crate::models::{BackendKind, Document, Metadata, SearchResult, WriteStats};

const OUTPUT_FIELDS: [&str; 4] = ["id", "url", "text", "metadata"];
const MAX_TEXT_LENGTH: usize = 65535;
/// Milvus rejects `offset + limit` above this, and any zero limit.
const MAX_QUERY_WINDOW: usize = 16384;

/// Limit to send for a page, or `None` when the page is necessarily empty.
fn query_window(limit: usize, offset: usize) -> Option<usize> {
    let room = MAX_QUERY_WINDOW.checked_sub(offset)?;
    match limit.min(room) {
        0 => None,
        limit => Some(limit),
    }
}

/// Milvus REST API response wrapper
#[derive(Debug, Deserialize)]
struct MilvusResponse<T> {
    code: i32,
    data: Option<T>,
    message: Option<String>,
}

impl<T> MilvusResponse<T> {
    fn into_result(self) -> VectorDbResult<Option<T>> {
        if self.code == 0 {
            Ok(self.data)
        } else {
            Err(VectorDbError::backend(format!(
                "Milvus error {}: {}",
                self.code,
                self.message.unwrap_or_else(|| "Unknown error".to_string())
            )))
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    collection_name: &'a str,
    data: Vec<Vec<f32>>,
    anns_field: &'static str,
    limit: usize,
    output_fields: [&'static str; 4],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    collection_name: &'a str,
    filter: String,
    limit: usize,
    offset: usize,
    output_fields: [&'static str; 4],
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertResult {
    #[serde(default)]
    insert_count: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollectionStats {
    #[serde(default)]
    row_count: u64,
}

/// Milvus backend speaking the REST v2 API.
///
/// Collections use a fixed schema: `id` (VarChar primary key), `url`,
/// `text`, `metadata` (JSON) and a float `vector` of the configured width.
pub struct MilvusDatabase {
    client: Client,
    base_url: String,
    config: MilvusConfig,
    collection: String,
    dimension: usize,
    embedder: Embedder,
}

impl MilvusDatabase {
    pub fn new(
        config: MilvusConfig,
        embedding: &EmbeddingConfig,
        provider: Option<Arc<dyn EmbeddingProvider>>,
        collection: impl Into<String>,
    ) -> VectorDbResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VectorDbError::Config(format!("failed to build Milvus client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            config,
            collection: collection.into(),
            dimension: embedding.vector_size,
            embedder: Embedder::new(provider, embedding.model.clone()),
        })
    }

    fn target<'a>(&'a self, collection: &'a Option<String>) -> &'a str {
        collection.as_deref().unwrap_or(&self.collection)
    }

    /// POST to a v2 endpoint, adding `dbName` when configured, and unwrap the envelope.
    async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> VectorDbResult<Option<T>> {
        let mut body = body;
        if let (Some(database), Value::Object(map)) = (&self.config.database, &mut body) {
            map.insert("dbName".to_string(), Value::String(database.clone()));
        }

        let url = format!("{}/v2/vectordb/{}", self.base_url, path);
        let mut request = self.client.post(&url).json(&body);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(VectorDbError::backend(format!(
                "Milvus request to {} failed ({}): {}",
                path, status, text
            )));
        }

        response.json::<MilvusResponse<T>>().await?.into_result()
    }

    async fn has_collection(&self, name: &str) -> VectorDbResult<bool> {
        let data: Option<Value> = self
            .post("collections/has", json!({ "collectionName": name }))
            .await?;
        Ok(data
            .and_then(|d| d.get("has").and_then(Value::as_bool))
            .unwrap_or(false))
    }

    async fn require_collection(&self, name: &str) -> VectorDbResult<()> {
        if self.has_collection(name).await? {
            Ok(())
        } else {
            Err(VectorDbError::CollectionNotFound(name.to_string()))
        }
    }

    fn create_collection_body(&self) -> Value {
        json!({
            "collectionName": self.collection,
            "schema": {
                "autoId": false,
                "enableDynamicField": false,
                "fields": [
                    {"fieldName": "id", "dataType": "VarChar", "isPrimary": true,
                     "elementTypeParams": {"max_length": 64}},
                    {"fieldName": "url", "dataType": "VarChar",
                     "elementTypeParams": {"max_length": 2048}},
                    {"fieldName": "text", "dataType": "VarChar",
                     "elementTypeParams": {"max_length": MAX_TEXT_LENGTH}},
                    {"fieldName": "metadata", "dataType": "JSON"},
                    {"fieldName": "vector", "dataType": "FloatVector",
                     "elementTypeParams": {"dim": self.dimension.to_string()}}
                ]
            },
            "indexParams": [
                {"fieldName": "vector", "indexName": "vector", "metricType": "COSINE",
                 "indexType": "AUTOINDEX"}
            ]
        })
    }

    fn row(&self, id: &str, document: &Document) -> VectorDbResult<Value> {
        let vector = document.vector.as_ref().ok_or_else(|| {
            VectorDbError::invalid_argument(format!("document '{}' has no vector", id))
        })?;
        if vector.len() != self.dimension {
            return Err(VectorDbError::invalid_argument(format!(
                "vector for document '{}' has {} dimensions, collection expects {}",
                id,
                vector.len(),
                self.dimension
            )));
        }

        Ok(json!({
            "id": id,
            "url": document.url,
            "text": document.text,
            "metadata": document.metadata,
            "vector": vector,
        }))
    }
}

fn row_id(row: &Value) -> Option<String> {
    match row.get("id") {
        Some(Value::String(id)) => Some(id.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn id_filter(ids: &[String]) -> String {
    let quoted: Vec<String> = ids.iter().map(|id| quote_filter_value(id)).collect();
    format!("id in [{}]", quoted.join(", "))
}

#[async_trait]
impl VectorDatabase for MilvusDatabase {
    fn kind(&self) -> BackendKind {
        BackendKind::Milvus
    }

    fn collection_name(&self) -> String {
        self.collection.clone()
    }

    async fn setup(&self, embedding: &str) -> VectorDbResult<()> {
        self.embedder.select(embedding).await;

        if self.has_collection(&self.collection).await? {
            debug!(collection = %self.collection, "Milvus collection already exists");
            return Ok(());
        }

        let _: Option<Value> = self
            .post("collections/create", self.create_collection_body())
            .await?;
        info!(collection = %self.collection, dimension = self.dimension, "Created Milvus collection");
        Ok(())
    }

    async fn cleanup(&self) -> VectorDbResult<()> {
        // The REST client holds no server-side session; data stays in Milvus.
        debug!(collection = %self.collection, "Released Milvus handle");
        Ok(())
    }

    async fn write_documents(&self, documents: Vec<Document>) -> VectorDbResult<WriteStats> {
        let started = Instant::now();
        let mut documents = documents;
        self.embedder.fill_vectors(&mut documents).await?;

        let mut ids = Vec::with_capacity(documents.len());
        let mut rows = Vec::with_capacity(documents.len());
        for document in &documents {
            let id = document
                .id
                .clone()
                .unwrap_or_else(|| Uuid::now_v7().to_string());
            rows.push(self.row(&id, document)?);
            ids.push(id);
        }

        let result: Option<InsertResult> = self
            .post(
                "entities/insert",
                json!({ "collectionName": self.collection, "data": rows }),
            )
            .await?;

        let inserted = result.map(|r| r.insert_count).unwrap_or(ids.len());
        let mut errors = Vec::new();
        if inserted < ids.len() {
            errors.push(format!(
                "Milvus inserted {} of {} documents",
                inserted,
                ids.len()
            ));
            ids.truncate(inserted);
        }

        Ok(WriteStats::new(ids, errors, started.elapsed()))
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        collection: Option<String>,
    ) -> VectorDbResult<Vec<SearchResult>> {
        let Some(window) = query_window(limit, 0) else {
            return Ok(Vec::new());
        };
        let target = self.target(&collection);
        let vector = self.embedder.embed_query(query).await?;

        let request = SearchRequest {
            collection_name: target,
            data: vec![vector],
            anns_field: "vector",
            limit: window,
            output_fields: OUTPUT_FIELDS,
        };
        let hits: Option<Vec<Value>> = self
            .post("entities/search", serde_json::to_value(&request)?)
            .await?;

        let mut results: Vec<SearchResult> = hits
            .unwrap_or_default()
            .iter()
            .map(|hit| SearchResult {
                document: document_from_row(row_id(hit), hit),
                score: hit.get("distance").and_then(Value::as_f64).unwrap_or(0.0) as f32,
            })
            .collect();

        // COSINE distance in Milvus is a similarity: larger is closer.
        SearchResult::sort_descending(&mut results);
        results.truncate(limit);
        Ok(results)
    }

    async fn list_documents(&self, limit: usize, offset: usize) -> VectorDbResult<Vec<Document>> {
        let Some(window) = query_window(limit, offset) else {
            debug!(limit, offset, "Page lies outside the Milvus query window");
            return Ok(Vec::new());
        };
        let request = QueryRequest {
            collection_name: &self.collection,
            filter: "id != \"\"".to_string(),
            limit: window,
            offset,
            output_fields: OUTPUT_FIELDS,
        };
        let rows: Option<Vec<Value>> = self
            .post("entities/query", serde_json::to_value(&request)?)
            .await?;

        Ok(rows
            .unwrap_or_default()
            .iter()
            .map(|row| document_from_row(row_id(row), row))
            .collect())
    }

    async fn count_documents(&self) -> VectorDbResult<u64> {
        let stats: Option<CollectionStats> = self
            .post(
                "collections/get_stats",
                json!({ "collectionName": self.collection }),
            )
            .await?;
        Ok(stats.unwrap_or_default().row_count)
    }

    async fn delete_document(&self, document_id: &str) -> VectorDbResult<()> {
        let found: Option<Vec<Value>> = self
            .post(
                "entities/get",
                json!({
                    "collectionName": self.collection,
                    "id": [document_id],
                    "outputFields": ["id"],
                }),
            )
            .await?;
        if found.unwrap_or_default().is_empty() {
            return Err(VectorDbError::DocumentNotFound(document_id.to_string()));
        }

        self.delete_documents(vec![document_id.to_string()])
            .await
            .map(|_| ())
    }

    async fn delete_documents(&self, document_ids: Vec<String>) -> VectorDbResult<usize> {
        if document_ids.is_empty() {
            return Ok(0);
        }

        let result: Option<Value> = self
            .post(
                "entities/delete",
                json!({
                    "collectionName": self.collection,
                    "filter": id_filter(&document_ids),
                }),
            )
            .await?;

        let deleted = result
            .and_then(|r| r.get("deleteCount").and_then(Value::as_u64))
            .map(|n| n as usize)
            .unwrap_or(document_ids.len());
        Ok(deleted)
    }

    async fn list_collections(&self) -> VectorDbResult<Vec<String>> {
        let names: Option<Vec<String>> = self.post("collections/list", json!({})).await?;
        Ok(names.unwrap_or_default())
    }

    async fn get_collection_info(&self, collection: Option<String>) -> VectorDbResult<Metadata> {
        let target = self.target(&collection);
        self.require_collection(target).await?;

        let described: Option<Value> = self
            .post("collections/describe", json!({ "collectionName": target }))
            .await?;

        let mut info = match described {
            Some(Value::Object(map)) => map,
            _ => Metadata::new(),
        };
        info.insert("name".to_string(), Value::String(target.to_string()));
        info.insert("type".to_string(), json!(BackendKind::Milvus));
        Ok(info)
    }

    async fn delete_collection(&self, collection: Option<String>) -> VectorDbResult<()> {
        let target = self.target(&collection);
        self.require_collection(target).await?;

        let _: Option<Value> = self
            .post("collections/drop", json!({ "collectionName": target }))
            .await?;
        info!(collection = %target, "Dropped Milvus collection");
        Ok(())
    }
}
