//! Render job handlers: submission, status, retry, cancel and the status
//! callback pushed by backends that support it.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use fastcut_backend::{BackendJobState, BackendStatus};
use fastcut_models::{RenderJob, RenderJobId};
use fastcut_pipeline::{ScriptSource, SubmitReceipt, SubmitRenderRequest};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Response for submission and retry.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: String,
    pub status: String,
    pub backend_call_id: String,
    pub render_backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_source: Option<String>,
}

impl From<SubmitReceipt> for SubmitResponse {
    fn from(receipt: SubmitReceipt) -> Self {
        let script_source = match receipt.script_source {
            ScriptSource::Explicit => Some("explicit"),
            ScriptSource::DerivedFromLyrics => Some("derived_from_lyrics"),
            ScriptSource::NoLyricsAvailable => Some("no_lyrics_available"),
            ScriptSource::None => None,
        };

        Self {
            job_id: receipt.job_id.to_string(),
            status: receipt.status.as_str().to_string(),
            backend_call_id: receipt.backend_call_id,
            render_backend: receipt.backend,
            script_source: script_source.map(String::from),
        }
    }
}

/// Job status response.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    pub status: String,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composed_output_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub retry_count: u32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<RenderJob> for JobStatusResponse {
    fn from(job: RenderJob) -> Self {
        Self {
            job_id: job.id.to_string(),
            campaign_id: job.campaign_id,
            status: job.status.as_str().to_string(),
            progress: job.progress,
            output_url: job.output_url,
            composed_output_url: job.composed_output_url,
            error_message: job.error_message,
            retry_count: job.retry_count,
            created_at: job.created_at.to_rfc3339(),
            updated_at: job.updated_at.to_rfc3339(),
        }
    }
}

/// Status report pushed by a render backend.
#[derive(Debug, Deserialize)]
pub struct CallbackReport {
    pub status: String,
    #[serde(default)]
    pub progress: Option<u8>,
    #[serde(default)]
    pub output_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub applied: bool,
}

/// Validate job ID format: alphanumeric and hyphens, 8-64 chars.
fn validate_job_id(id: &str) -> Result<RenderJobId, ApiError> {
    let valid = id.len() >= 8
        && id.len() <= 64
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if !valid {
        return Err(ApiError::Validation(format!("invalid job id: {id}")));
    }
    Ok(RenderJobId::from_string(id))
}

/// POST /api/renders
///
/// Submit a render job. Returns 202 with the backend correlation handle;
/// progress is observed via GET or the reconciliation sweep.
pub async fn submit_render(
    State(state): State<AppState>,
    Json(request): Json<SubmitRenderRequest>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    if let Some(id) = &request.generation_id {
        validate_job_id(id)?;
    }

    let receipt = state.service.submit(request).await?;
    info!(job_id = %receipt.job_id, "Render job submitted");

    Ok((StatusCode::ACCEPTED, Json(receipt.into())))
}

/// GET /api/renders/:job_id
pub async fn get_render(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusResponse>> {
    let id = validate_job_id(&job_id)?;
    let job = state.service.status(&id).await?;
    Ok(Json(job.into()))
}

/// POST /api/renders/:job_id/retry
///
/// Resubmit a failed job from its stored envelope. 409 when the job is not
/// in Failed status.
pub async fn retry_render(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let id = validate_job_id(&job_id)?;
    let receipt = state.service.retry(&id).await?;
    Ok((StatusCode::ACCEPTED, Json(receipt.into())))
}

/// POST /api/renders/:job_id/cancel
pub async fn cancel_render(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusResponse>> {
    let id = validate_job_id(&job_id)?;
    let job = state.service.cancel(&id).await?;
    Ok(Json(job.into()))
}

/// POST /api/renders/:job_id/callback
///
/// Status pushed by the backend. Races freely with the polling sweep; the
/// store's transition rules decide which write wins, so a late callback
/// after a terminal poll is acknowledged but not applied.
pub async fn render_callback(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Json(report): Json<CallbackReport>,
) -> ApiResult<Json<CallbackResponse>> {
    let id = validate_job_id(&job_id)?;

    let state_kind = match report.status.to_lowercase().as_str() {
        "queued" | "pending" => BackendJobState::Queued,
        "running" | "processing" => BackendJobState::Running,
        "succeeded" | "done" | "success" => BackendJobState::Succeeded,
        "failed" | "error" => BackendJobState::Failed,
        "cancelled" => BackendJobState::Cancelled,
        other => {
            return Err(ApiError::Validation(format!(
                "unknown callback status: {other}"
            )))
        }
    };

    let status = BackendStatus {
        state: state_kind,
        progress: report.progress,
        output_url: report.output_url,
        error: report.error,
    };

    let transition = state.reconciler.apply_report(&id, &status).await?;
    Ok(Json(CallbackResponse {
        applied: transition.is_applied(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_validation() {
        assert!(validate_job_id("12345678").is_ok());
        assert!(validate_job_id("abc-def-123-456").is_ok());
        assert!(validate_job_id("short").is_err());
        assert!(validate_job_id("has/slash-but-long-enough").is_err());
        assert!(validate_job_id("has..dots-but-long-enough").is_err());
        assert!(validate_job_id(&"x".repeat(65)).is_err());
    }
}
