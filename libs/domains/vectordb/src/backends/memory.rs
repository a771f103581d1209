use std::collections::{HashMap, HashSet};
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::VectorDatabase;
use crate::error::{VectorDbError, VectorDbResult};
use crate::models::{BackendKind, DEFAULT_EMBEDDING, Document, Metadata, SearchResult, WriteStats};

#[derive(Debug)]
struct MemoryCollection {
    documents: Vec<Document>,
    /// Document id to position in `documents`
    index: HashMap<String, usize>,
    created_at: DateTime<Utc>,
}

impl MemoryCollection {
    fn new() -> Self {
        Self {
            documents: Vec::new(),
            index: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Insert in arrival order, or replace in place when the id is taken.
    fn upsert(&mut self, id: String, document: Document) {
        match self.index.get(&id) {
            Some(&position) => self.documents[position] = document,
            None => {
                self.index.insert(id, self.documents.len());
                self.documents.push(document);
            }
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    fn remove_all(&mut self, ids: &HashSet<&str>) -> usize {
        let before = self.documents.len();
        self.documents
            .retain(|doc| !doc.id.as_deref().is_some_and(|id| ids.contains(id)));
        self.index = self
            .documents
            .iter()
            .enumerate()
            .filter_map(|(position, doc)| doc.id.clone().map(|id| (id, position)))
            .collect();
        before - self.documents.len()
    }
}

#[derive(Debug)]
struct MemoryState {
    collections: HashMap<String, MemoryCollection>,
    embedding: String,
}

/// In-process vector database for development and tests.
///
/// Similarity is token-overlap cosine over lowercased words, so results are
/// deterministic without any embedding provider.
#[derive(Debug)]
pub struct InMemoryDatabase {
    collection: String,
    state: RwLock<MemoryState>,
}

impl InMemoryDatabase {
    pub fn new(collection: impl Into<String>) -> Self {
        let collection = collection.into();
        let mut collections = HashMap::new();
        collections.insert(collection.clone(), MemoryCollection::new());

        Self {
            collection,
            state: RwLock::new(MemoryState {
                collections,
                embedding: DEFAULT_EMBEDDING.to_string(),
            }),
        }
    }

    fn target(&self, collection: Option<String>) -> String {
        collection.unwrap_or_else(|| self.collection.clone())
    }
}

fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn similarity(query: &HashSet<String>, text: &str) -> f32 {
    let doc = tokenize(text);
    if query.is_empty() || doc.is_empty() {
        return 0.0;
    }
    let shared = query.intersection(&doc).count() as f32;
    shared / ((query.len() * doc.len()) as f32).sqrt()
}

#[async_trait]
impl VectorDatabase for InMemoryDatabase {
    fn kind(&self) -> BackendKind {
        BackendKind::Mock
    }

    fn collection_name(&self) -> String {
        self.collection.clone()
    }

    async fn setup(&self, embedding: &str) -> VectorDbResult<()> {
        let mut state = self.state.write().await;
        state.embedding = embedding.to_string();
        state
            .collections
            .entry(self.collection.clone())
            .or_insert_with(MemoryCollection::new);
        Ok(())
    }

    async fn cleanup(&self) -> VectorDbResult<()> {
        let mut state = self.state.write().await;
        state.collections.clear();
        tracing::debug!(collection = %self.collection, "In-memory database cleared");
        Ok(())
    }

    async fn write_documents(&self, documents: Vec<Document>) -> VectorDbResult<WriteStats> {
        let started = Instant::now();
        let mut state = self.state.write().await;
        let collection = state
            .collections
            .entry(self.collection.clone())
            .or_insert_with(MemoryCollection::new);

        let mut ids = Vec::with_capacity(documents.len());
        for mut document in documents {
            let id = document
                .id
                .clone()
                .unwrap_or_else(|| Uuid::now_v7().to_string());
            document.id = Some(id.clone());
            collection.upsert(id.clone(), document);
            ids.push(id);
        }

        Ok(WriteStats::new(ids, Vec::new(), started.elapsed()))
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        collection: Option<String>,
    ) -> VectorDbResult<Vec<SearchResult>> {
        let target = self.target(collection);
        let state = self.state.read().await;
        let stored = state
            .collections
            .get(&target)
            .ok_or(VectorDbError::CollectionNotFound(target))?;

        let terms = tokenize(query);
        let mut results: Vec<SearchResult> = stored
            .documents
            .iter()
            .map(|document| SearchResult {
                score: similarity(&terms, &document.text),
                document: document.clone(),
            })
            .collect();

        SearchResult::sort_descending(&mut results);
        results.truncate(limit);
        Ok(results)
    }

    async fn list_documents(&self, limit: usize, offset: usize) -> VectorDbResult<Vec<Document>> {
        let state = self.state.read().await;
        let stored = state
            .collections
            .get(&self.collection)
            .ok_or_else(|| VectorDbError::CollectionNotFound(self.collection.clone()))?;

        Ok(stored
            .documents
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_documents(&self) -> VectorDbResult<u64> {
        let state = self.state.read().await;
        state
            .collections
            .get(&self.collection)
            .map(|stored| stored.documents.len() as u64)
            .ok_or_else(|| VectorDbError::CollectionNotFound(self.collection.clone()))
    }

    async fn delete_document(&self, document_id: &str) -> VectorDbResult<()> {
        self.delete_documents(vec![document_id.to_string()])
            .await
            .map(|_| ())
    }

    async fn delete_documents(&self, document_ids: Vec<String>) -> VectorDbResult<usize> {
        let mut state = self.state.write().await;
        let stored = state
            .collections
            .get_mut(&self.collection)
            .ok_or_else(|| VectorDbError::CollectionNotFound(self.collection.clone()))?;

        // Nothing is removed unless every id exists.
        if let Some(missing) = document_ids.iter().find(|id| !stored.contains(id)) {
            return Err(VectorDbError::DocumentNotFound(missing.clone()));
        }

        let doomed: HashSet<&str> = document_ids.iter().map(String::as_str).collect();
        Ok(stored.remove_all(&doomed))
    }

    async fn list_collections(&self) -> VectorDbResult<Vec<String>> {
        let state = self.state.read().await;
        let mut names: Vec<String> = state.collections.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn get_collection_info(&self, collection: Option<String>) -> VectorDbResult<Metadata> {
        let target = self.target(collection);
        let state = self.state.read().await;
        let stored = state
            .collections
            .get(&target)
            .ok_or_else(|| VectorDbError::CollectionNotFound(target.clone()))?;

        let info = json!({
            "name": target,
            "type": BackendKind::Mock,
            "document_count": stored.documents.len(),
            "created_at": stored.created_at.to_rfc3339(),
            "embedding": state.embedding,
        });
        Ok(match info {
            serde_json::Value::Object(map) => map,
            _ => Metadata::new(),
        })
    }

    async fn delete_collection(&self, collection: Option<String>) -> VectorDbResult<()> {
        let target = self.target(collection);
        let mut state = self.state.write().await;
        state
            .collections
            .remove(&target)
            .map(|_| ())
            .ok_or(VectorDbError::CollectionNotFound(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    async fn seeded(texts: &[&str]) -> (InMemoryDatabase, Vec<String>) {
        let db = InMemoryDatabase::new("Docs");
        let docs = texts
            .iter()
            .enumerate()
            .map(|(i, text)| Document::new(format!("https://example.com/{i}"), *text))
            .collect();
        let stats = db.write_documents(docs).await.unwrap();
        (db, stats.document_ids)
    }

    #[tokio::test]
    async fn test_write_assigns_ids_and_counts() {
        let (db, ids) = seeded(&["alpha", "beta"]).await;

        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert_eq!(db.count_documents().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_write_with_existing_id_replaces() {
        let db = InMemoryDatabase::new("Docs");
        db.write_document(Document::new("u", "old").with_id("fixed")).await.unwrap();
        db.write_document(Document::new("u", "new").with_id("fixed")).await.unwrap();

        let docs = db.list_documents(10, 0).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "new");
    }

    #[tokio::test]
    async fn test_replace_after_delete_keeps_order() {
        let db = InMemoryDatabase::new("Docs");
        for id in ["a", "b", "c"] {
            db.write_document(Document::new("u", id).with_id(id)).await.unwrap();
        }

        db.delete_document("a").await.unwrap();
        db.write_document(Document::new("u", "c2").with_id("c")).await.unwrap();
        db.write_document(Document::new("u", "d").with_id("d")).await.unwrap();

        let texts: Vec<_> = db
            .list_documents(10, 0)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.text)
            .collect();
        assert_eq!(texts, ["b", "c2", "d"]);

        db.write_document(Document::new("u", "a2").with_id("a")).await.unwrap();
        assert_eq!(db.count_documents().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_search_orders_by_score_and_limits() {
        let (db, _) = seeded(&[
            "cooking pasta at home",
            "rust async runtime internals",
            "rust ownership and borrowing in rust programs",
        ])
        .await;

        let results = db.search("rust runtime", 2, None).await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].score >= results[1].score);
        assert_eq!(results[0].document.text, "rust async runtime internals");
        assert!(results.iter().all(|r| r.document.id.is_some()));
    }

    #[tokio::test]
    async fn test_query_returns_summary() {
        let (db, _) = seeded(&["vector databases store embeddings"]).await;

        let summary = db.query("vector", 5, None).await.unwrap();
        assert!(summary.starts_with("Found 1 relevant documents for query 'vector':"));
    }

    #[tokio::test]
    async fn test_list_documents_paginates() {
        let (db, ids) = seeded(&["a", "b", "c", "d", "e"]).await;

        let page = db.list_documents(2, 1).await.unwrap();
        let page_ids: Vec<_> = page.iter().map(|d| d.id.clone().unwrap()).collect();
        assert_eq!(page_ids, ids[1..3]);

        assert!(db.list_documents(10, 5).await.unwrap().is_empty());
        assert!(db.list_documents(10, 50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_document_and_missing_id() {
        let (db, ids) = seeded(&["one", "two"]).await;

        db.delete_document(&ids[0]).await.unwrap();
        assert_eq!(db.count_documents().await.unwrap(), 1);

        let err = db.delete_document(&ids[0]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete_documents_is_all_or_nothing() {
        let (db, ids) = seeded(&["one", "two"]).await;

        let err = db
            .delete_documents(vec![ids[0].clone(), "missing".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, VectorDbError::DocumentNotFound(ref id) if id == "missing"));
        assert_eq!(db.count_documents().await.unwrap(), 2);

        assert_eq!(db.delete_documents(ids).await.unwrap(), 2);
        assert_eq!(db.count_documents().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_setup_is_idempotent() {
        let (db, _) = seeded(&["keep me"]).await;

        db.setup("default").await.unwrap();
        db.setup("custom-model").await.unwrap();

        assert_eq!(db.count_documents().await.unwrap(), 1);
        let info = db.get_collection_info(None).await.unwrap();
        assert_eq!(info["embedding"], "custom-model");
        assert_eq!(info["document_count"], 1);
    }

    #[tokio::test]
    async fn test_collection_management() {
        let db = InMemoryDatabase::new("Docs");
        assert_eq!(db.list_collections().await.unwrap(), vec!["Docs".to_string()]);

        let err = db.search("x", 5, Some("Other".into())).await.unwrap_err();
        assert!(matches!(err, VectorDbError::CollectionNotFound(_)));

        db.delete_collection(None).await.unwrap();
        assert!(db.list_collections().await.unwrap().is_empty());
        assert!(db.delete_collection(None).await.is_err());
    }
}
