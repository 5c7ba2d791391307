//! Pipeline error taxonomy.
//!
//! User-correctable failures (`InvalidStyleSet`, `MissingRequiredInput`) are
//! raised before anything is persisted; backend failures keep their
//! retryable/non-retryable distinction from the backend crate.

use fastcut_backend::BackendError;
use fastcut_models::RenderStatus;
use fastcut_store::StoreError;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Unknown style set identifier; user-correctable
    #[error("Unknown style set: {0}")]
    InvalidStyleSet(String),

    /// Required input missing or malformed; user-correctable
    #[error("Missing required input: {0}")]
    MissingRequiredInput(String),

    #[error("Job not found: {0}")]
    NotFound(String),

    /// Retry requested on a job not in Failed status
    #[error("Job {id} is not retryable in status {status}")]
    NotRetryable { id: String, status: RenderStatus },

    /// The requested lifecycle change is not legal from the current status
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Asset lookup failed: {0}")]
    Asset(String),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl PipelineError {
    pub fn missing_input(msg: impl Into<String>) -> Self {
        Self::MissingRequiredInput(msg.into())
    }

    /// True when retrying the same request can succeed without changes.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Backend(e) => e.is_retryable(),
            PipelineError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl From<StoreError> for PipelineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => PipelineError::NotFound(id),
            StoreError::NotRetryable { id, status } => PipelineError::NotRetryable { id, status },
            other => PipelineError::Store(other),
        }
    }
}
