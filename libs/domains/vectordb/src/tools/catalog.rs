use serde_json::{Value, json};

use super::{Arguments, ToolDescriptor, ToolRequest};
use crate::config::OperationCategory;
use crate::error::VectorDbResult;
use crate::models::{BackendKind, DEFAULT_COLLECTION, DEFAULT_EMBEDDING};

const DEFAULT_QUERY_LIMIT: usize = 5;
const DEFAULT_LIST_LIMIT: usize = 10;

/// Every tool the server exposes, in listing order.
pub(super) fn default_tools() -> Vec<ToolDescriptor> {
    vec![
        // ====================================================================
        // Instance administration
        // ====================================================================
        ToolDescriptor::new(
            "create_vector_database",
            "Create a new named vector database instance backed by Milvus, Weaviate or the in-memory mock",
            OperationCategory::Admin,
            json!({
                "type": "object",
                "properties": {
                    "db_name": db_name_property(),
                    "db_type": {
                        "type": "string",
                        "enum": BackendKind::ALL.iter().map(|k| k.as_str()).collect::<Vec<_>>(),
                        "description": "Backend to use"
                    },
                    "collection_name": {
                        "type": "string",
                        "description": "Collection to write into",
                        "default": DEFAULT_COLLECTION
                    }
                },
                "required": ["db_name", "db_type"]
            }),
            parse_create_database,
        ),
        ToolDescriptor::new(
            "list_databases",
            "List all active vector database instances with their document counts",
            OperationCategory::Admin,
            json!({
                "type": "object",
                "properties": {}
            }),
            |_| Ok(ToolRequest::ListDatabases),
        ),
        ToolDescriptor::new(
            "setup_database",
            "Provision storage for a vector database. Succeeds without changes if it already exists",
            OperationCategory::Setup,
            json!({
                "type": "object",
                "properties": {
                    "db_name": db_name_property(),
                    "embedding": {
                        "type": "string",
                        "description": "Embedding model to use, or 'default'",
                        "default": DEFAULT_EMBEDDING
                    }
                },
                "required": ["db_name"]
            }),
            |args| {
                Ok(ToolRequest::SetupDatabase {
                    db_name: args.required_str("db_name")?,
                    embedding: args.str_or("embedding", DEFAULT_EMBEDDING)?,
                })
            },
        ),
        // ====================================================================
        // Documents
        // ====================================================================
        ToolDescriptor::new(
            "write_document",
            "Write a single document to a vector database",
            OperationCategory::WriteSingle,
            document_schema(true),
            |args| {
                Ok(ToolRequest::WriteDocument {
                    db_name: args.required_str("db_name")?,
                    document: args.document()?,
                })
            },
        ),
        ToolDescriptor::new(
            "write_documents",
            "Write a batch of documents to a vector database. One invalid document rejects the whole batch",
            OperationCategory::Write,
            json!({
                "type": "object",
                "properties": {
                    "db_name": db_name_property(),
                    "documents": {
                        "type": "array",
                        "minItems": 1,
                        "items": document_schema(false)
                    }
                },
                "required": ["db_name", "documents"]
            }),
            |args| {
                Ok(ToolRequest::WriteDocuments {
                    db_name: args.required_str("db_name")?,
                    documents: args.required_documents("documents")?,
                })
            },
        ),
        ToolDescriptor::new(
            "query",
            "Search a vector database and return a readable summary of the best matches",
            OperationCategory::Query,
            search_schema(),
            |args| {
                let (db_name, query, limit, collection) = parse_search(args)?;
                Ok(ToolRequest::Query {
                    db_name,
                    query,
                    limit,
                    collection,
                })
            },
        ),
        ToolDescriptor::new(
            "search",
            "Search a vector database and return scored documents",
            OperationCategory::Query,
            search_schema(),
            |args| {
                let (db_name, query, limit, collection) = parse_search(args)?;
                Ok(ToolRequest::Search {
                    db_name,
                    query,
                    limit,
                    collection,
                })
            },
        ),
        ToolDescriptor::new(
            "list_documents",
            "List documents in a vector database",
            OperationCategory::ListDocuments,
            json!({
                "type": "object",
                "properties": {
                    "db_name": db_name_property(),
                    "limit": {
                        "type": "integer",
                        "minimum": 0,
                        "default": DEFAULT_LIST_LIMIT
                    },
                    "offset": {
                        "type": "integer",
                        "minimum": 0,
                        "default": 0
                    }
                },
                "required": ["db_name"]
            }),
            |args| {
                Ok(ToolRequest::ListDocuments {
                    db_name: args.required_str("db_name")?,
                    limit: args.usize_or("limit", DEFAULT_LIST_LIMIT)?,
                    offset: args.usize_or("offset", 0)?,
                })
            },
        ),
        ToolDescriptor::new(
            "count_documents",
            "Count the documents in a vector database",
            OperationCategory::CountDocuments,
            db_name_only_schema(),
            |args| {
                Ok(ToolRequest::CountDocuments {
                    db_name: args.required_str("db_name")?,
                })
            },
        ),
        ToolDescriptor::new(
            "delete_document",
            "Delete a document by id",
            OperationCategory::Delete,
            json!({
                "type": "object",
                "properties": {
                    "db_name": db_name_property(),
                    "document_id": {
                        "type": "string",
                        "description": "Id of the document to delete"
                    }
                },
                "required": ["db_name", "document_id"]
            }),
            |args| {
                Ok(ToolRequest::DeleteDocument {
                    db_name: args.required_str("db_name")?,
                    document_id: args.required_str("document_id")?,
                })
            },
        ),
        ToolDescriptor::new(
            "delete_documents",
            "Delete several documents by id",
            OperationCategory::Delete,
            json!({
                "type": "object",
                "properties": {
                    "db_name": db_name_property(),
                    "document_ids": {
                        "type": "array",
                        "minItems": 1,
                        "items": { "type": "string" }
                    }
                },
                "required": ["db_name", "document_ids"]
            }),
            |args| {
                Ok(ToolRequest::DeleteDocuments {
                    db_name: args.required_str("db_name")?,
                    document_ids: args.required_str_list("document_ids")?,
                })
            },
        ),
        // ====================================================================
        // Collections
        // ====================================================================
        ToolDescriptor::new(
            "list_collections",
            "List the collections known to a vector database",
            OperationCategory::Collections,
            db_name_only_schema(),
            |args| {
                Ok(ToolRequest::ListCollections {
                    db_name: args.required_str("db_name")?,
                })
            },
        ),
        ToolDescriptor::new(
            "get_collection_info",
            "Describe a collection. Defaults to the database's own collection",
            OperationCategory::Collections,
            collection_schema(),
            |args| {
                Ok(ToolRequest::GetCollectionInfo {
                    db_name: args.required_str("db_name")?,
                    collection: args.optional_str("collection_name")?,
                })
            },
        ),
        ToolDescriptor::new(
            "delete_collection",
            "Drop a collection and its documents. Defaults to the database's own collection",
            OperationCategory::Delete,
            collection_schema(),
            |args| {
                Ok(ToolRequest::DeleteCollection {
                    db_name: args.required_str("db_name")?,
                    collection: args.optional_str("collection_name")?,
                })
            },
        ),
        ToolDescriptor::new(
            "cleanup",
            "Release a vector database's resources and remove it from the server",
            OperationCategory::Cleanup,
            db_name_only_schema(),
            |args| {
                Ok(ToolRequest::Cleanup {
                    db_name: args.required_str("db_name")?,
                })
            },
        ),
    ]
}

fn parse_create_database(args: &Arguments<'_>) -> VectorDbResult<ToolRequest> {
    let db_name = args.required_str("db_name")?;
    let db_type = args.required_str("db_type")?;
    let collection = args.str_or("collection_name", DEFAULT_COLLECTION)?;

    Ok(ToolRequest::CreateDatabase {
        db_name,
        kind: db_type.parse()?,
        collection,
    })
}

fn parse_search(args: &Arguments<'_>) -> VectorDbResult<(String, String, usize, Option<String>)> {
    Ok((
        args.required_str("db_name")?,
        args.required_str("query")?,
        args.usize_or("limit", DEFAULT_QUERY_LIMIT)?,
        args.optional_str("collection_name")?,
    ))
}

// ============================================================================
// Schema fragments
// ============================================================================

fn db_name_property() -> Value {
    json!({
        "type": "string",
        "description": "Name of the vector database instance"
    })
}

fn db_name_only_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "db_name": db_name_property()
        },
        "required": ["db_name"]
    })
}

fn collection_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "db_name": db_name_property(),
            "collection_name": {
                "type": "string",
                "description": "Collection name"
            }
        },
        "required": ["db_name"]
    })
}

fn search_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "db_name": db_name_property(),
            "query": {
                "type": "string",
                "description": "Search text"
            },
            "limit": {
                "type": "integer",
                "minimum": 0,
                "default": DEFAULT_QUERY_LIMIT
            },
            "collection_name": {
                "type": "string",
                "description": "Collection to search instead of the default"
            }
        },
        "required": ["db_name", "query"]
    })
}

/// Document fields, optionally with `db_name` for the single-write tool.
fn document_schema(with_db_name: bool) -> Value {
    let mut schema = json!({
        "type": "object",
        "properties": {
            "url": { "type": "string" },
            "text": { "type": "string" },
            "metadata": { "type": "object" },
            "vector": {
                "type": "array",
                "items": { "type": "number" },
                "description": "Pre-computed embedding"
            }
        },
        "required": ["url", "text"]
    });

    if with_db_name {
        schema["properties"]["db_name"] = db_name_property();
        schema["required"] = json!(["db_name", "url", "text"]);
    }
    schema
}
