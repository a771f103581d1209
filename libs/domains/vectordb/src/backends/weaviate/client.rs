use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::WeaviateConfig;
use crate::backends::document_from_row;
use crate::database::VectorDatabase;
use crate::embedding::{Embedder, EmbeddingConfig, EmbeddingProvider};
use crate::error::{VectorDbError, VectorDbResult};
use crate::models::{BackendKind, Document, Metadata, SearchResult, WriteStats};

/// Weaviate requires class names to start with an uppercase letter.
fn class_name(collection: &str) -> String {
    let mut chars = collection.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn class_definition(class: &str) -> Value {
    json!({
        "class": class,
        "description": "Documents managed by the vector MCP server",
        "vectorizer": "none",
        "properties": [
            {"name": "url", "dataType": ["text"]},
            {"name": "text", "dataType": ["text"]},
            {"name": "metadata", "dataType": ["text"],
             "description": "JSON-encoded document metadata"}
        ]
    })
}

fn near_vector_query(class: &str, vector: &[f32], limit: usize) -> VectorDbResult<String> {
    Ok(format!(
        "{{ Get {{ {class}(nearVector: {{vector: {vector}}}, limit: {limit}) \
         {{ url text metadata _additional {{ id distance certainty }} }} }} }}",
        vector = serde_json::to_string(vector)?,
    ))
}

fn bm25_query(class: &str, query: &str, limit: usize) -> VectorDbResult<String> {
    Ok(format!(
        "{{ Get {{ {class}(bm25: {{query: {query}}}, limit: {limit}) \
         {{ url text metadata _additional {{ id score }} }} }} }}",
        query = serde_json::to_string(query)?,
    ))
}

fn count_query(class: &str) -> String {
    format!("{{ Aggregate {{ {class} {{ meta {{ count }} }} }} }}")
}

/// Similarity from a hit's `_additional` block: certainty, then
/// `1 - distance`, then the BM25 score (returned as a string).
fn hit_score(additional: &Value) -> f32 {
    if let Some(certainty) = additional.get("certainty").and_then(Value::as_f64) {
        return certainty as f32;
    }
    if let Some(distance) = additional.get("distance").and_then(Value::as_f64) {
        return (1.0 - distance) as f32;
    }
    match additional.get("score") {
        Some(Value::String(raw)) => raw.parse().unwrap_or(0.0),
        Some(other) => other.as_f64().unwrap_or(0.0) as f32,
        None => 0.0,
    }
}

fn parse_hits(class: &str, response: &Value) -> Vec<SearchResult> {
    response
        .pointer(&format!("/data/Get/{}", class))
        .and_then(Value::as_array)
        .map(|hits| {
            hits.iter()
                .map(|hit| {
                    let additional = hit.get("_additional").cloned().unwrap_or(Value::Null);
                    let id = additional
                        .get("id")
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    SearchResult {
                        document: document_from_row(id, hit),
                        score: hit_score(&additional),
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Collect per-object errors from a `/v1/batch/objects` response.
fn batch_errors(response: &Value) -> Vec<(String, String)> {
    response
        .as_array()
        .map(|objects| {
            objects
                .iter()
                .filter_map(|object| {
                    let messages: Vec<&str> = object
                        .pointer("/result/errors/error")
                        .and_then(Value::as_array)?
                        .iter()
                        .filter_map(|e| e.get("message").and_then(Value::as_str))
                        .collect();
                    if messages.is_empty() {
                        return None;
                    }
                    let id = object
                        .get("id")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    Some((id, messages.join("; ")))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Weaviate backend over the REST and GraphQL APIs.
///
/// Classes are created with `vectorizer: none`; vectors come from the
/// request or from the configured embedding provider. Without a provider,
/// text search falls back to BM25.
pub struct WeaviateDatabase {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    collection: String,
    embedder: Embedder,
}

impl WeaviateDatabase {
    pub fn new(
        config: WeaviateConfig,
        embedding: &EmbeddingConfig,
        provider: Option<Arc<dyn EmbeddingProvider>>,
        collection: &str,
    ) -> VectorDbResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                VectorDbError::Config(format!("failed to build Weaviate client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            collection: class_name(collection),
            embedder: Embedder::new(provider, embedding.model.clone()),
        })
    }

    fn target(&self, collection: Option<String>) -> String {
        collection
            .map(|c| class_name(&c))
            .unwrap_or_else(|| self.collection.clone())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}/v1/{}", self.base_url, path));
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Send and return status plus parsed body. Non-2xx other than 404 is an error.
    async fn send(&self, request: RequestBuilder, what: &str) -> VectorDbResult<(StatusCode, Value)> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() && status != StatusCode::NOT_FOUND {
            return Err(VectorDbError::backend(format!(
                "Weaviate {} failed ({}): {}",
                what, status, text
            )));
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)?
        };
        Ok((status, body))
    }

    async fn graphql(&self, query: String) -> VectorDbResult<Value> {
        let request = self
            .request(Method::POST, "graphql")
            .json(&json!({ "query": query }));
        let (status, body) = self.send(request, "GraphQL query").await?;
        if status == StatusCode::NOT_FOUND {
            return Err(VectorDbError::backend("Weaviate GraphQL endpoint not found"));
        }

        let messages: Vec<&str> = body
            .get("errors")
            .and_then(Value::as_array)
            .map(|errors| {
                errors
                    .iter()
                    .filter_map(|e| e.get("message").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();
        if !messages.is_empty() {
            return Err(VectorDbError::backend(format!(
                "Weaviate GraphQL error: {}",
                messages.join("; ")
            )));
        }
        Ok(body)
    }

    async fn class_schema(&self, class: &str) -> VectorDbResult<Option<Value>> {
        let (status, body) = self
            .send(self.request(Method::GET, &format!("schema/{}", class)), "schema lookup")
            .await?;
        Ok((status != StatusCode::NOT_FOUND).then_some(body))
    }

    async fn count_class(&self, class: &str) -> VectorDbResult<u64> {
        let body = self.graphql(count_query(class)).await?;
        Ok(body
            .pointer(&format!("/data/Aggregate/{}/0/meta/count", class))
            .and_then(Value::as_u64)
            .unwrap_or(0))
    }

    fn batch_object(&self, id: &str, document: &Document) -> VectorDbResult<Value> {
        let mut object = json!({
            "class": self.collection,
            "id": id,
            "properties": {
                "url": document.url,
                "text": document.text,
                "metadata": serde_json::to_string(&document.metadata)?,
            }
        });
        if let (Some(vector), Value::Object(map)) = (&document.vector, &mut object) {
            map.insert("vector".to_string(), json!(vector));
        }
        Ok(object)
    }
}

#[async_trait]
impl VectorDatabase for WeaviateDatabase {
    fn kind(&self) -> BackendKind {
        BackendKind::Weaviate
    }

    fn collection_name(&self) -> String {
        self.collection.clone()
    }

    async fn setup(&self, embedding: &str) -> VectorDbResult<()> {
        self.embedder.select(embedding).await;

        if self.class_schema(&self.collection).await?.is_some() {
            debug!(class = %self.collection, "Weaviate class already exists");
            return Ok(());
        }

        let request = self
            .request(Method::POST, "schema")
            .json(&class_definition(&self.collection));
        self.send(request, "class creation").await?;
        info!(class = %self.collection, "Created Weaviate class");
        Ok(())
    }

    async fn cleanup(&self) -> VectorDbResult<()> {
        debug!(class = %self.collection, "Released Weaviate handle");
        Ok(())
    }

    async fn write_documents(&self, documents: Vec<Document>) -> VectorDbResult<WriteStats> {
        let started = Instant::now();
        let mut documents = documents;
        if self.embedder.is_available() {
            self.embedder.fill_vectors(&mut documents).await?;
        }

        let mut ids = Vec::with_capacity(documents.len());
        let mut objects = Vec::with_capacity(documents.len());
        for document in &documents {
            let id = match &document.id {
                Some(id) => Uuid::parse_str(id)
                    .map_err(|_| {
                        VectorDbError::invalid_argument(format!(
                            "document id '{}' must be a UUID for Weaviate",
                            id
                        ))
                    })?
                    .to_string(),
                None => Uuid::new_v4().to_string(),
            };
            objects.push(self.batch_object(&id, document)?);
            ids.push(id);
        }

        let request = self
            .request(Method::POST, "batch/objects")
            .json(&json!({ "objects": objects }));
        let (_, body) = self.send(request, "batch write").await?;

        let failures = batch_errors(&body);
        if !failures.is_empty() {
            warn!(class = %self.collection, failed = failures.len(), "Weaviate rejected some documents");
        }
        ids.retain(|id| !failures.iter().any(|(failed, _)| failed == id));
        let errors = failures
            .into_iter()
            .map(|(id, message)| format!("{}: {}", id, message))
            .collect();

        Ok(WriteStats::new(ids, errors, started.elapsed()))
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        collection: Option<String>,
    ) -> VectorDbResult<Vec<SearchResult>> {
        let class = self.target(collection);
        let graphql = if self.embedder.is_available() {
            let vector = self.embedder.embed_query(query).await?;
            near_vector_query(&class, &vector, limit)?
        } else {
            bm25_query(&class, query, limit)?
        };

        let body = self.graphql(graphql).await?;
        let mut results = parse_hits(&class, &body);
        SearchResult::sort_descending(&mut results);
        results.truncate(limit);
        Ok(results)
    }

    async fn list_documents(&self, limit: usize, offset: usize) -> VectorDbResult<Vec<Document>> {
        let request = self.request(Method::GET, "objects").query(&[
            ("class", self.collection.clone()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ]);
        let (status, body) = self.send(request, "object listing").await?;
        if status == StatusCode::NOT_FOUND {
            return Err(VectorDbError::CollectionNotFound(self.collection.clone()));
        }

        Ok(body
            .get("objects")
            .and_then(Value::as_array)
            .map(|objects| {
                objects
                    .iter()
                    .map(|object| {
                        let id = object.get("id").and_then(Value::as_str).map(str::to_string);
                        let properties = object.get("properties").cloned().unwrap_or(Value::Null);
                        document_from_row(id, &properties)
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn count_documents(&self) -> VectorDbResult<u64> {
        self.count_class(&self.collection).await
    }

    async fn delete_document(&self, document_id: &str) -> VectorDbResult<()> {
        let path = format!("objects/{}/{}", self.collection, document_id);
        let (status, _) = self
            .send(self.request(Method::DELETE, &path), "object deletion")
            .await?;
        if status == StatusCode::NOT_FOUND {
            return Err(VectorDbError::DocumentNotFound(document_id.to_string()));
        }
        Ok(())
    }

    async fn delete_documents(&self, document_ids: Vec<String>) -> VectorDbResult<usize> {
        for id in &document_ids {
            self.delete_document(id).await?;
        }
        Ok(document_ids.len())
    }

    async fn list_collections(&self) -> VectorDbResult<Vec<String>> {
        let (_, body) = self
            .send(self.request(Method::GET, "schema"), "schema listing")
            .await?;
        Ok(body
            .get("classes")
            .and_then(Value::as_array)
            .map(|classes| {
                classes
                    .iter()
                    .filter_map(|c| c.get("class").and_then(Value::as_str).map(str::to_string))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_collection_info(&self, collection: Option<String>) -> VectorDbResult<Metadata> {
        let class = self.target(collection);
        let schema = self
            .class_schema(&class)
            .await?
            .ok_or_else(|| VectorDbError::CollectionNotFound(class.clone()))?;

        let mut info = Metadata::new();
        info.insert("name".to_string(), Value::String(class.clone()));
        info.insert("type".to_string(), json!(BackendKind::Weaviate));
        info.insert("document_count".to_string(), json!(self.count_class(&class).await?));
        info.insert("schema".to_string(), schema);
        Ok(info)
    }

    async fn delete_collection(&self, collection: Option<String>) -> VectorDbResult<()> {
        let class = self.target(collection);
        let (status, _) = self
            .send(
                self.request(Method::DELETE, &format!("schema/{}", class)),
                "class deletion",
            )
            .await?;
        if status == StatusCode::NOT_FOUND {
            return Err(VectorDbError::CollectionNotFound(class));
        }
        info!(class = %class, "Deleted Weaviate class");
        Ok(())
    }
}
