//! Vector MCP Server
//!
//! Exposes vector database tools over HTTP+JSON for AI agents.
//!
//! ## Architecture
//!
//! ```text
//! Agent
//!   ↓ POST /mcp/tools/call {name, arguments}
//! Dispatcher (domain_vectordb)
//!   ↓ typed ToolRequest, per-category deadline
//! ToolHandlers → InstanceRegistry
//!   ↓
//! ┌─────────┬──────────┬────────────┐
//! │ Milvus  │ Weaviate │ in-memory  │
//! └─────────┴──────────┴────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: Environment-driven configuration
//! - `server`: Server initialization and lifecycle

pub mod config;
pub mod server;

pub use server::run;
