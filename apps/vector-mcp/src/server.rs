//! HTTP server initialization and lifecycle management
//!
//! This module handles all server setup:
//! - Tracing initialization
//! - Optional embedding provider setup
//! - Dispatcher and instance registry creation
//! - Axum server startup with graceful shutdown
//! - Releasing every live vector database on shutdown

use std::sync::Arc;

use axum_helpers::server::{create_production_app, with_common_layers};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_vectordb::embedding::OpenAIProvider;
use domain_vectordb::{Dispatcher, InstanceRegistry, ToolHandlers};
use eyre::{Result, WrapErr};
use tracing::{info, warn};

use crate::config::Config;

/// Run the HTTP server
///
/// This is the main entry point for server initialization. It:
/// 1. Installs color-eyre and structured logging (JSON for prod, pretty for dev)
/// 2. Loads configuration from the environment
/// 3. Optionally attaches the OpenAI embedding provider
/// 4. Builds the dispatcher over an empty instance registry
/// 5. Serves until SIGINT/SIGTERM, then cleans up every instance
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is invalid
/// - Server binding fails
/// - Server runtime encounters an error
pub async fn run() -> Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    info!(
        name = config.app.name,
        version = config.app.version,
        "Starting vector MCP server"
    );

    let mut backends = config.backends.clone();
    match OpenAIProvider::from_env() {
        Ok(provider) => {
            info!("OpenAI embedding provider configured");
            backends = backends.with_embedding_provider(Arc::new(provider));
        }
        Err(e) => {
            info!(reason = %e, "No embedding provider configured; remote backends need pre-computed vectors");
        }
    }

    let instances = Arc::new(InstanceRegistry::new());
    let handlers = ToolHandlers::new(Arc::clone(&instances), backends);
    let dispatcher = Arc::new(Dispatcher::new(handlers, config.mcp.clone()));
    info!(tools = dispatcher.tools().len(), "Tool registry ready");

    let app = with_common_layers(domain_vectordb::http::router(dispatcher));

    create_production_app(
        app,
        &config.server,
        config.mcp.shutdown_timeout,
        release_instances(instances),
    )
    .await
    .wrap_err("Server error")?;

    info!("Vector MCP server shutdown complete");
    Ok(())
}

/// Drain the registry and clean up each backend. Failures are logged and
/// do not stop the remaining instances from being released.
async fn release_instances(instances: Arc<InstanceRegistry>) {
    let drained = instances.drain().await;
    info!(count = drained.len(), "Releasing vector databases");

    for (name, db) in drained {
        match db.cleanup().await {
            Ok(()) => info!(instance = %name, "Vector database released"),
            Err(e) => warn!(instance = %name, error = %e, "Failed to release vector database"),
        }
    }
}
