//! Store error types.

use fastcut_models::RenderStatus;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job {id} is not retryable in status {status}")]
    NotRetryable { id: String, status: RenderStatus },

    #[error("Concurrent update conflict on job {0}")]
    Conflict(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    pub fn not_retryable(id: impl Into<String>, status: RenderStatus) -> Self {
        Self::NotRetryable {
            id: id.into(),
            status,
        }
    }

    /// Check if error is retryable by the caller without changing inputs.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Redis(_) | StoreError::Conflict(_))
    }
}
