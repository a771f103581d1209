use core_config::{AppInfo, FromEnv, app_info, server::ServerConfig};
use domain_vectordb::{BackendFactory, McpConfig};
use eyre::{Result, WrapErr};

// Re-export Environment for use in other modules
pub use core_config::Environment;

/// Application configuration.
/// Composes the shared config components with the vector database settings.
#[derive(Clone)]
pub struct Config {
    pub app: AppInfo,
    pub environment: Environment,
    pub server: ServerConfig,
    pub mcp: McpConfig,
    /// Backend connection settings. The embedding provider is attached at startup.
    pub backends: BackendFactory,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let environment = Environment::from_env();
        let server = ServerConfig::from_env().wrap_err("Failed to load server configuration")?;
        let mcp = McpConfig::from_env().wrap_err("Failed to load tool timeout configuration")?;
        let backends =
            BackendFactory::from_env().wrap_err("Failed to load vector database configuration")?;

        Ok(Self {
            app: app_info!(),
            environment,
            server,
            mcp,
            backends,
        })
    }
}
