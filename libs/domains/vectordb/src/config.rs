use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use core_config::{ConfigError, FromEnv, env_optional, env_parse_or};

/// Timeout bucket a tool belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationCategory {
    Admin,
    Setup,
    WriteSingle,
    Write,
    Query,
    ListDocuments,
    CountDocuments,
    Delete,
    Collections,
    Cleanup,
}

impl OperationCategory {
    pub const ALL: [OperationCategory; 10] = [
        OperationCategory::Admin,
        OperationCategory::Setup,
        OperationCategory::WriteSingle,
        OperationCategory::Write,
        OperationCategory::Query,
        OperationCategory::ListDocuments,
        OperationCategory::CountDocuments,
        OperationCategory::Delete,
        OperationCategory::Collections,
        OperationCategory::Cleanup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationCategory::Admin => "admin",
            OperationCategory::Setup => "setup_database",
            OperationCategory::WriteSingle => "write_single",
            OperationCategory::Write => "write",
            OperationCategory::Query => "query",
            OperationCategory::ListDocuments => "list_documents",
            OperationCategory::CountDocuments => "count_documents",
            OperationCategory::Delete => "delete",
            OperationCategory::Collections => "collections",
            OperationCategory::Cleanup => "cleanup",
        }
    }

    /// Environment variable overriding this category, e.g. `MCP_TIMEOUT_QUERY_SECS`.
    pub fn env_key(&self) -> String {
        format!("MCP_TIMEOUT_{}_SECS", self.as_str().to_ascii_uppercase())
    }

    /// Built-in override, if the category differs from the tool default.
    fn default_timeout(&self) -> Option<Duration> {
        match self {
            OperationCategory::Query => Some(Duration::from_secs(30)),
            OperationCategory::Write => Some(Duration::from_secs(900)),
            OperationCategory::Delete => Some(Duration::from_secs(60)),
            _ => None,
        }
    }
}

impl fmt::Display for OperationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tool-call timeouts and shutdown budget
#[derive(Debug, Clone)]
pub struct McpConfig {
    /// Applies to any category without its own entry
    pub tool_timeout: Duration,
    pub category_timeouts: HashMap<OperationCategory, Duration>,
    /// Upper bound on releasing instances at shutdown
    pub shutdown_timeout: Duration,
}

impl McpConfig {
    pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(15);
    pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

    /// Timeout for a category, falling back to the tool default.
    pub fn timeout_for(&self, category: OperationCategory) -> Duration {
        self.category_timeouts
            .get(&category)
            .copied()
            .unwrap_or(self.tool_timeout)
    }

    /// Budget for each per-instance count inside `list_databases`. Half the
    /// admin deadline, so one stalled backend cannot time out the whole listing.
    pub fn count_timeout(&self) -> Duration {
        self.timeout_for(OperationCategory::Admin) / 2
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_timeout(mut self, category: OperationCategory, timeout: Duration) -> Self {
        self.category_timeouts.insert(category, timeout);
        self
    }
}

impl Default for McpConfig {
    fn default() -> Self {
        let category_timeouts = OperationCategory::ALL
            .iter()
            .filter_map(|c| c.default_timeout().map(|t| (*c, t)))
            .collect();

        Self {
            tool_timeout: Self::DEFAULT_TOOL_TIMEOUT,
            category_timeouts,
            shutdown_timeout: Self::DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

fn positive_secs(key: &str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::ParseError {
            key: key.to_string(),
            details: "timeout must be at least one second".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

impl FromEnv for McpConfig {
    /// Reads:
    /// - `MCP_TOOL_TIMEOUT_SECS` (default 15)
    /// - `MCP_TIMEOUT_<CATEGORY>_SECS` per category
    /// - `MCP_SHUTDOWN_TIMEOUT_SECS` (default 30)
    fn from_env() -> Result<Self, ConfigError> {
        let mut config = McpConfig::default();

        let tool_secs = env_parse_or("MCP_TOOL_TIMEOUT_SECS", config.tool_timeout.as_secs())?;
        config.tool_timeout = positive_secs("MCP_TOOL_TIMEOUT_SECS", tool_secs)?;

        for category in OperationCategory::ALL {
            let key = category.env_key();
            if env_optional(&key).is_some() {
                let secs: u64 = env_parse_or(&key, 0)?;
                config
                    .category_timeouts
                    .insert(category, positive_secs(&key, secs)?);
            }
        }

        let shutdown_secs = env_parse_or(
            "MCP_SHUTDOWN_TIMEOUT_SECS",
            config.shutdown_timeout.as_secs(),
        )?;
        config.shutdown_timeout = positive_secs("MCP_SHUTDOWN_TIMEOUT_SECS", shutdown_secs)?;

        Ok(config)
    }
}
