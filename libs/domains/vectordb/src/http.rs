//! HTTP surface: health, tool listing and tool calls.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::dispatch::Dispatcher;
use crate::tools::ToolInfo;

/// Body of `POST /mcp/tools/call`
#[derive(Debug, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Router for the MCP endpoints. Layers are applied by the caller.
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/mcp/tools/list", get(list_tools))
        .route("/mcp/tools/call", post(call_tool))
        .with_state(dispatcher)
}

async fn health(State(dispatcher): State<Arc<Dispatcher>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "vector_databases": dispatcher.instances().len().await,
    }))
}

async fn list_tools(State(dispatcher): State<Arc<Dispatcher>>) -> Json<Value> {
    let tools: Vec<ToolInfo<'_>> = dispatcher.tools().list().iter().map(|t| t.info()).collect();
    Json(json!({ "tools": tools }))
}

/// Unparsable bodies are a plain-text 400; everything past parsing is
/// mapped by [`VectorDbError`](crate::VectorDbError)'s response impl.
async fn call_tool(State(dispatcher): State<Arc<Dispatcher>>, body: Bytes) -> Response {
    let call: ToolCall = match serde_json::from_slice(&body) {
        Ok(call) => call,
        Err(e) => {
            debug!(error = %e, "Rejected tool call body");
            return (StatusCode::BAD_REQUEST, "Invalid JSON").into_response();
        }
    };

    match dispatcher.call(&call.name, &call.arguments).await {
        Ok(result) => Json(json!({ "result": result })).into_response(),
        Err(e) => e.into_response(),
    }
}
