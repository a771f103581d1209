use core_config::{ConfigError, FromEnv, env_optional, env_or_default, env_parse_or};

/// Milvus REST connection configuration
#[derive(Debug, Clone)]
pub struct MilvusConfig {
    pub url: String,
    /// `user:password` or an API key, sent as a bearer token
    pub token: Option<String>,
    pub database: Option<String>,
    pub timeout_secs: u64,
}

impl MilvusConfig {
    pub fn new(url: String) -> Self {
        Self {
            url,
            ..Self::default()
        }
    }

    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_database(mut self, database: String) -> Self {
        self.database = Some(database);
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl FromEnv for MilvusConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = env_or_default("MILVUS_URL", "http://localhost:19530");
        let token = env_optional("MILVUS_TOKEN");
        let database = env_optional("MILVUS_DATABASE");
        let timeout_secs = env_parse_or("MILVUS_TIMEOUT_SECS", 30)?;

        Ok(Self {
            url,
            token,
            database,
            timeout_secs,
        })
    }
}

impl Default for MilvusConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:19530".to_string(),
            token: None,
            database: None,
            timeout_secs: 30,
        }
    }
}
