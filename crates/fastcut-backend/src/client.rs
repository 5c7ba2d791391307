//! The `RenderBackend` trait and backend selection.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use fastcut_models::RenderEnvelope;

use crate::batch::BatchBackend;
use crate::config::{BackendConfig, BackendKind};
use crate::error::{BackendError, BackendResult};
use crate::local::LocalBackend;
use crate::serverless::ServerlessBackend;
use crate::wire::{BackendStatus, OutputDestination, SubmitAck};

/// A render compute target.
///
/// Implementations normalize their native submit/status shapes into
/// [`SubmitAck`] and [`BackendStatus`]; callers never see backend-specific
/// fields. No implementation persists anything: recording the returned
/// call id is the caller's job.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    /// Which backend this is.
    fn kind(&self) -> BackendKind;

    /// Submit a render job. Fails synchronously; the error kind tells the
    /// caller whether retrying the same envelope can succeed.
    async fn submit(
        &self,
        job_id: &str,
        envelope: &RenderEnvelope,
        output: &OutputDestination,
    ) -> BackendResult<SubmitAck>;

    /// Poll the status of a previously submitted job.
    async fn poll_status(&self, call_id: &str) -> BackendResult<BackendStatus>;
}

/// Build the backend selected by configuration. Called once at startup.
pub fn create_backend(config: &BackendConfig) -> BackendResult<Arc<dyn RenderBackend>> {
    Ok(match config.kind {
        BackendKind::Local => Arc::new(LocalBackend::new(config.clone())?),
        BackendKind::Serverless => Arc::new(ServerlessBackend::new(config.clone())?),
        BackendKind::Batch => Arc::new(BatchBackend::new(config.clone())?),
    })
}

/// Build an HTTP client with the configured timeout.
pub(crate) fn build_http(config: &BackendConfig) -> BackendResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(config.timeout)
        .build()?)
}

/// Map an HTTP response onto the error taxonomy.
///
/// 4xx means the backend looked at the payload and said no; 5xx and 429 are
/// infrastructure trouble and retryable.
pub(crate) async fn check_response(
    response: reqwest::Response,
) -> BackendResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status.is_client_error() && status.as_u16() != 429 {
        Err(BackendError::Rejected {
            status: status.as_u16(),
            message: body,
        })
    } else {
        Err(BackendError::unreachable(format!(
            "backend returned {}: {}",
            status, body
        )))
    }
}

/// Execute with bounded exponential-backoff retry for retryable errors only.
pub(crate) async fn with_retry<F, Fut, T>(
    max_retries: u32,
    operation: &str,
    op: F,
) -> BackendResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = BackendResult<T>>,
{
    let mut last_error = None;

    for attempt in 0..=max_retries {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_retries => {
                let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                warn!(
                    "{} failed (attempt {}), retrying in {:?}: {}",
                    operation,
                    attempt + 1,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| BackendError::unreachable("retries exhausted")))
}
