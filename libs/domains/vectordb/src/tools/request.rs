use crate::models::{BackendKind, Document};

/// A validated tool invocation, one variant per tool.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    CreateDatabase {
        db_name: String,
        kind: BackendKind,
        collection: String,
    },
    ListDatabases,
    SetupDatabase {
        db_name: String,
        embedding: String,
    },
    WriteDocument {
        db_name: String,
        document: Document,
    },
    WriteDocuments {
        db_name: String,
        documents: Vec<Document>,
    },
    Query {
        db_name: String,
        query: String,
        limit: usize,
        collection: Option<String>,
    },
    Search {
        db_name: String,
        query: String,
        limit: usize,
        collection: Option<String>,
    },
    ListDocuments {
        db_name: String,
        limit: usize,
        offset: usize,
    },
    CountDocuments {
        db_name: String,
    },
    DeleteDocument {
        db_name: String,
        document_id: String,
    },
    DeleteDocuments {
        db_name: String,
        document_ids: Vec<String>,
    },
    ListCollections {
        db_name: String,
    },
    GetCollectionInfo {
        db_name: String,
        collection: Option<String>,
    },
    DeleteCollection {
        db_name: String,
        collection: Option<String>,
    },
    Cleanup {
        db_name: String,
    },
}
