use core_config::{ConfigError, FromEnv, env_optional, env_or_default, env_parse_or};

/// Weaviate connection configuration
#[derive(Debug, Clone)]
pub struct WeaviateConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl WeaviateConfig {
    pub fn new(url: String) -> Self {
        Self {
            url,
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }
}

impl FromEnv for WeaviateConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env_or_default("WEAVIATE_URL", "http://localhost:8080"),
            api_key: env_optional("WEAVIATE_API_KEY"),
            timeout_secs: env_parse_or("WEAVIATE_TIMEOUT_SECS", 10)?,
        })
    }
}

impl Default for WeaviateConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}
