//! Backend client error types.
//!
//! The split between [`BackendError::Unreachable`] and
//! [`BackendError::Rejected`] is load-bearing: unreachable is retryable with
//! the same envelope, rejected is not.

use thiserror::Error;

pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Debug, Error)]
pub enum BackendError {
    /// Transient network/infra failure; safe to retry with the same envelope
    #[error("Render backend unreachable: {0}")]
    Unreachable(String),

    /// The backend rejected the payload; retrying without changing the
    /// envelope will fail again
    #[error("Render backend rejected payload ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BackendError {
    pub fn unreachable(msg: impl Into<String>) -> Self {
        Self::Unreachable(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BackendError::Unreachable(_) | BackendError::Timeout(_) | BackendError::Network(_)
        )
    }
}
