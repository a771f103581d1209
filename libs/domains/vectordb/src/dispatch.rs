use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::config::McpConfig;
use crate::error::{ErrorKind, VectorDbError, VectorDbResult};
use crate::handlers::ToolHandlers;
use crate::registry::InstanceRegistry;
use crate::tools::{Arguments, ToolRegistry};

/// Resolves, validates and executes tool calls under per-category deadlines.
pub struct Dispatcher {
    tools: ToolRegistry,
    handlers: ToolHandlers,
    config: McpConfig,
}

impl Dispatcher {
    /// Dispatcher over the full default tool set.
    pub fn new(handlers: ToolHandlers, config: McpConfig) -> Self {
        Self::with_tools(ToolRegistry::with_default_tools(), handlers, config)
    }

    pub fn with_tools(tools: ToolRegistry, handlers: ToolHandlers, config: McpConfig) -> Self {
        Self {
            tools,
            handlers: handlers.with_count_timeout(config.count_timeout()),
            config,
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn instances(&self) -> &Arc<InstanceRegistry> {
        self.handlers.instances()
    }

    pub fn config(&self) -> &McpConfig {
        &self.config
    }

    /// Run one tool call to completion.
    ///
    /// Dropping the returned future cancels the call at its next await point.
    #[instrument(skip(self, name, arguments), fields(tool = %name))]
    pub async fn call(&self, name: &str, arguments: &Value) -> VectorDbResult<Value> {
        let started = Instant::now();

        let outcome = self.execute(name, arguments).await;
        match &outcome {
            Ok(_) => info!(elapsed = ?started.elapsed(), "Tool call completed"),
            Err(e) => match e.kind() {
                ErrorKind::BackendFailure | ErrorKind::Timeout => {
                    error!(elapsed = ?started.elapsed(), error = %e, "Tool call failed")
                }
                _ => warn!(elapsed = ?started.elapsed(), error = %e, "Tool call rejected"),
            },
        }
        outcome
    }

    async fn execute(&self, name: &str, arguments: &Value) -> VectorDbResult<Value> {
        let tool = self.tools.resolve(name)?;
        let request = tool.parse(&Arguments::from_value(arguments)?)?;

        let deadline = self.config.timeout_for(tool.category);
        tokio::time::timeout(deadline, self.handlers.handle(request))
            .await
            .map_err(|_| VectorDbError::Timeout {
                tool: name.to_string(),
                after: deadline,
            })?
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::config::OperationCategory;
    use crate::database::VectorDatabase;
    use crate::factory::BackendFactory;
    use crate::models::{BackendKind, Document, Metadata, SearchResult, WriteStats};

    fn dispatcher(config: McpConfig) -> Dispatcher {
        let handlers = ToolHandlers::new(Arc::new(InstanceRegistry::new()), BackendFactory::default());
        Dispatcher::new(handlers, config)
    }

    /// Backend whose every call hangs.
    struct Stalled;

    #[async_trait]
    impl VectorDatabase for Stalled {
        fn kind(&self) -> BackendKind {
            BackendKind::Mock
        }

        fn collection_name(&self) -> String {
            "Stalled".into()
        }

        async fn setup(&self, _: &str) -> VectorDbResult<()> {
            std::future::pending().await
        }

        async fn cleanup(&self) -> VectorDbResult<()> {
            std::future::pending().await
        }

        async fn write_documents(&self, _: Vec<Document>) -> VectorDbResult<WriteStats> {
            std::future::pending().await
        }

        async fn search(&self, _: &str, _: usize, _: Option<String>) -> VectorDbResult<Vec<SearchResult>> {
            std::future::pending().await
        }

        async fn list_documents(&self, _: usize, _: usize) -> VectorDbResult<Vec<Document>> {
            std::future::pending().await
        }

        async fn count_documents(&self) -> VectorDbResult<u64> {
            std::future::pending().await
        }

        async fn delete_document(&self, _: &str) -> VectorDbResult<()> {
            std::future::pending().await
        }

        async fn delete_documents(&self, _: Vec<String>) -> VectorDbResult<usize> {
            std::future::pending().await
        }

        async fn list_collections(&self) -> VectorDbResult<Vec<String>> {
            std::future::pending().await
        }

        async fn get_collection_info(&self, _: Option<String>) -> VectorDbResult<Metadata> {
            std::future::pending().await
        }

        async fn delete_collection(&self, _: Option<String>) -> VectorDbResult<()> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let err = dispatcher(McpConfig::default())
            .call("nope", &json!({}))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ToolNotFound);
    }

    #[tokio::test]
    async fn test_non_object_arguments_rejected() {
        let err = dispatcher(McpConfig::default())
            .call("list_databases", &json!([1, 2]))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_mock_database_lifecycle() {
        let dispatcher = dispatcher(McpConfig::default());

        let created = dispatcher
            .call(
                "create_vector_database",
                &json!({"db_name": "db1", "db_type": "mock"}),
            )
            .await
            .unwrap();
        assert_eq!(
            created,
            "Successfully created mock vector database 'db1' with collection 'MaestroDocs'"
        );

        dispatcher
            .call(
                "write_documents",
                &json!({"db_name": "db1", "documents": [
                    {"url": "u1", "text": "rust ownership and borrowing"},
                    {"url": "u2", "text": "python generators", "metadata": {"lang": "py"}}
                ]}),
            )
            .await
            .unwrap();

        let count = dispatcher
            .call("count_documents", &json!({"db_name": "db1"}))
            .await
            .unwrap();
        assert_eq!(count, json!({"count": 2}));

        let summary = dispatcher
            .call("query", &json!({"db_name": "db1", "query": "rust borrowing", "limit": 1}))
            .await
            .unwrap();
        let summary = summary.as_str().unwrap();
        assert!(summary.starts_with("Found 1 relevant documents for query 'rust borrowing'"));
        assert!(summary.contains("rust ownership and borrowing"));

        dispatcher
            .call("cleanup", &json!({"db_name": "db1"}))
            .await
            .unwrap();
        let err = dispatcher
            .call("count_documents", &json!({"db_name": "db1"}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_bad_vector_entry_writes_nothing() {
        let dispatcher = dispatcher(McpConfig::default());
        dispatcher
            .call(
                "create_vector_database",
                &json!({"db_name": "db1", "db_type": "mock"}),
            )
            .await
            .unwrap();

        let err = dispatcher
            .call(
                "write_documents",
                &json!({"db_name": "db1", "documents": [
                    {"url": "u1", "text": "fine", "vector": [0.1, 0.2]},
                    {"url": "u2", "text": "broken", "vector": [0.1, "x"]}
                ]}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("documents[1].vector"));

        let count = dispatcher
            .call("count_documents", &json!({"db_name": "db1"}))
            .await
            .unwrap();
        assert_eq!(count["count"], 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_backend_times_out() {
        let config = McpConfig::default().with_timeout(OperationCategory::Query, Duration::from_secs(2));
        let dispatcher = dispatcher(config);
        let stalled: crate::registry::InstanceHandle = Arc::new(Stalled);
        dispatcher
            .instances()
            .create("slow", || async move { Ok(stalled) })
            .await
            .unwrap();

        let err = dispatcher
            .call("query", &json!({"db_name": "slow", "query": "anything"}))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.to_string(), "tool 'query' timed out after 2s");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_back_to_tool_default() {
        let config = McpConfig::default().with_tool_timeout(Duration::from_secs(1));
        let dispatcher = dispatcher(config);
        let stalled: crate::registry::InstanceHandle = Arc::new(Stalled);
        dispatcher
            .instances()
            .create("slow", || async move { Ok(stalled) })
            .await
            .unwrap();

        let err = dispatcher
            .call("count_documents", &json!({"db_name": "slow"}))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "tool 'count_documents' timed out after 1s");
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_databases_survives_stalled_count() {
        let config = McpConfig::default().with_timeout(OperationCategory::Admin, Duration::from_secs(2));
        let dispatcher = dispatcher(config);
        dispatcher
            .call(
                "create_vector_database",
                &json!({"db_name": "fast", "db_type": "mock"}),
            )
            .await
            .unwrap();
        let stalled: crate::registry::InstanceHandle = Arc::new(Stalled);
        dispatcher
            .instances()
            .create("slow", || async move { Ok(stalled) })
            .await
            .unwrap();

        let listed = dispatcher.call("list_databases", &json!({})).await.unwrap();

        assert_eq!(
            listed["databases"],
            json!([
                {"name": "fast", "type": "mock", "collection": "MaestroDocs", "document_count": 0},
                {"name": "slow", "type": "mock", "collection": "Stalled", "document_count": -1}
            ])
        );
    }

    #[tokio::test]
    async fn test_stalled_cleanup_leaves_other_instances_usable() {
        let dispatcher = Arc::new(dispatcher(McpConfig::default()));
        dispatcher
            .call(
                "create_vector_database",
                &json!({"db_name": "fast", "db_type": "mock"}),
            )
            .await
            .unwrap();
        let stalled: crate::registry::InstanceHandle = Arc::new(Stalled);
        dispatcher
            .instances()
            .create("slow", || async move { Ok(stalled) })
            .await
            .unwrap();

        let stuck = tokio::spawn({
            let dispatcher = Arc::clone(&dispatcher);
            async move { dispatcher.call("cleanup", &json!({"db_name": "slow"})).await.map(|_| ()) }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let count = tokio::time::timeout(
            Duration::from_secs(1),
            dispatcher.call("count_documents", &json!({"db_name": "fast"})),
        )
        .await
        .expect("count on another instance must not wait for the cleanup")
        .unwrap();
        assert_eq!(count, json!({"count": 0}));
        assert_eq!(
            tokio::time::timeout(Duration::from_secs(1), dispatcher.instances().len())
                .await
                .unwrap(),
            2
        );

        stuck.abort();
    }
}
