use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_helpers::ErrorResponse;
use thiserror::Error;

/// Coarse classification of a [`VectorDbError`], stable across wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    AlreadyExists,
    UnsupportedBackend,
    Timeout,
    BackendFailure,
    ToolNotFound,
}

#[derive(Debug, Error)]
pub enum VectorDbError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("vector database '{0}' not found. Please create it first")]
    InstanceNotFound(String),

    #[error("document '{0}' not found")]
    DocumentNotFound(String),

    #[error("collection '{0}' does not exist")]
    CollectionNotFound(String),

    #[error("vector database '{0}' already exists")]
    AlreadyExists(String),

    #[error("unsupported vector database type: {0}")]
    UnsupportedBackend(String),

    #[error("Tool '{0}' not found")]
    ToolNotFound(String),

    #[error("tool '{tool}' timed out after {after:?}")]
    Timeout { tool: String, after: Duration },

    #[error("{operation} failed for vector database '{instance}': {source}")]
    Operation {
        operation: &'static str,
        instance: String,
        #[source]
        source: Box<VectorDbError>,
    },

    #[error("{0}")]
    Backend(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type VectorDbResult<T> = Result<T, VectorDbError>;

impl VectorDbError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        VectorDbError::InvalidArgument(message.into())
    }

    pub fn backend(message: impl Into<String>) -> Self {
        VectorDbError::Backend(message.into())
    }

    /// Classification of this error. Looks through [`VectorDbError::Operation`]
    /// wrappers so a wrapped document lookup still reports `NotFound`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VectorDbError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            VectorDbError::InstanceNotFound(_)
            | VectorDbError::DocumentNotFound(_)
            | VectorDbError::CollectionNotFound(_) => ErrorKind::NotFound,
            VectorDbError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            VectorDbError::UnsupportedBackend(_) => ErrorKind::UnsupportedBackend,
            VectorDbError::ToolNotFound(_) => ErrorKind::ToolNotFound,
            VectorDbError::Timeout { .. } => ErrorKind::Timeout,
            VectorDbError::Operation { source, .. } => source.kind(),
            VectorDbError::Backend(_) | VectorDbError::Embedding(_) | VectorDbError::Config(_) => {
                ErrorKind::BackendFailure
            }
        }
    }
}

/// Attach operation and instance context to backend failures.
pub trait OperationContext<T> {
    fn in_operation(self, operation: &'static str, instance: &str) -> VectorDbResult<T>;
}

impl<T> OperationContext<T> for VectorDbResult<T> {
    fn in_operation(self, operation: &'static str, instance: &str) -> VectorDbResult<T> {
        self.map_err(|source| VectorDbError::Operation {
            operation,
            instance: instance.to_string(),
            source: Box::new(source),
        })
    }
}

impl From<reqwest::Error> for VectorDbError {
    fn from(err: reqwest::Error) -> Self {
        VectorDbError::Backend(format!("HTTP request failed: {}", err))
    }
}

impl From<serde_json::Error> for VectorDbError {
    fn from(err: serde_json::Error) -> Self {
        VectorDbError::Backend(format!("JSON error: {}", err))
    }
}

impl From<core_config::ConfigError> for VectorDbError {
    fn from(err: core_config::ConfigError) -> Self {
        VectorDbError::Config(err.to_string())
    }
}

/// Unknown tools are a plain-text 404; every other failure is a 500 with the
/// JSON error envelope.
impl IntoResponse for VectorDbError {
    fn into_response(self) -> Response {
        match self.kind() {
            ErrorKind::ToolNotFound => (StatusCode::NOT_FOUND, self.to_string()).into_response(),
            _ => ErrorResponse::new(self.to_string()).with_status(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}
