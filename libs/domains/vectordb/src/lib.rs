//! Vector Database Domain Library
//!
//! Serves a fixed catalogue of vector-database tools over HTTP+JSON. Callers
//! create named backend instances at runtime and then address them by name.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │   http::router   │  ← /health, /mcp/tools/list, /mcp/tools/call
//! └────────┬─────────┘
//!          │
//! ┌────────▼─────────┐     ┌──────────────────┐
//! │    Dispatcher    │────►│   ToolRegistry   │  name → descriptor + parser
//! └────────┬─────────┘     └──────────────────┘
//!          │ ToolRequest
//! ┌────────▼─────────┐     ┌──────────────────┐
//! │   ToolHandlers   │────►│ InstanceRegistry │  name → Arc<dyn VectorDatabase>
//! └────────┬─────────┘     └──────────────────┘
//!          │
//! ┌────────▼─────────┐
//! │  VectorDatabase  │  Milvus │ Weaviate │ in-memory mock
//! └──────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use domain_vectordb::{BackendFactory, Dispatcher, InstanceRegistry, McpConfig, ToolHandlers};
//!
//! let handlers = ToolHandlers::new(Arc::new(InstanceRegistry::new()), BackendFactory::default());
//! let dispatcher = Arc::new(Dispatcher::new(handlers, McpConfig::default()));
//! let app = domain_vectordb::http::router(dispatcher);
//! # let _ = app;
//! ```

pub mod backends;
pub mod config;
pub mod database;
pub mod dispatch;
pub mod embedding;
pub mod error;
pub mod factory;
pub mod handlers;
pub mod http;
pub mod models;
pub mod registry;
pub mod tools;

pub use config::{McpConfig, OperationCategory};
pub use database::VectorDatabase;
pub use dispatch::Dispatcher;
pub use error::{ErrorKind, VectorDbError, VectorDbResult};
pub use factory::BackendFactory;
pub use handlers::ToolHandlers;
pub use models::{BackendKind, DatabaseSummary, Document, SearchResult, WriteStats};
pub use registry::{InstanceHandle, InstanceRegistry};
pub use tools::{ToolDescriptor, ToolRegistry, ToolRequest};
