//! Local render service adapter.
//!
//! Talks to a render process running next to the API (dev and single-box
//! deployments). Simplest of the three: the service speaks the canonical
//! request shape natively.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use fastcut_models::RenderEnvelope;

use crate::client::{build_http, check_response, with_retry, RenderBackend};
use crate::config::{BackendConfig, BackendKind};
use crate::error::{BackendError, BackendResult};
use crate::wire::{BackendJobState, BackendStatus, OutputDestination, RenderRequest, SubmitAck};

pub struct LocalBackend {
    http: reqwest::Client,
    config: BackendConfig,
}

#[derive(Debug, Deserialize)]
struct LocalSubmitResponse {
    call_id: String,
}

#[derive(Debug, Deserialize)]
struct LocalStatusResponse {
    status: String,
    #[serde(default)]
    progress: Option<u8>,
    #[serde(default)]
    output_url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl LocalBackend {
    pub fn new(config: BackendConfig) -> BackendResult<Self> {
        let http = build_http(&config)?;
        Ok(Self { http, config })
    }

    fn map_state(status: &str) -> BackendResult<BackendJobState> {
        match status {
            "queued" => Ok(BackendJobState::Queued),
            "running" => Ok(BackendJobState::Running),
            "done" => Ok(BackendJobState::Succeeded),
            "error" => Ok(BackendJobState::Failed),
            "cancelled" => Ok(BackendJobState::Cancelled),
            other => Err(BackendError::invalid_response(format!(
                "unknown local render status: {}",
                other
            ))),
        }
    }
}

#[async_trait]
impl RenderBackend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn submit(
        &self,
        job_id: &str,
        envelope: &RenderEnvelope,
        output: &OutputDestination,
    ) -> BackendResult<SubmitAck> {
        let request = RenderRequest::from_envelope(job_id, envelope, output);
        let url = format!("{}/render", self.config.base_url);

        debug!(job_id, "Submitting render to local backend");

        let response = with_retry(self.config.max_retries, "local submit", || async {
            let resp = self.http.post(&url).json(&request).send().await?;
            check_response(resp).await
        })
        .await?;

        let ack: LocalSubmitResponse = response.json().await?;
        Ok(SubmitAck {
            call_id: ack.call_id,
            backend: BackendKind::Local,
        })
    }

    async fn poll_status(&self, call_id: &str) -> BackendResult<BackendStatus> {
        let url = format!("{}/render/{}/status", self.config.base_url, call_id);

        let response = with_retry(self.config.max_retries, "local poll", || async {
            let resp = self.http.get(&url).send().await?;
            check_response(resp).await
        })
        .await?;

        let status: LocalStatusResponse = response.json().await?;
        Ok(BackendStatus {
            state: Self::map_state(&status.status)?,
            progress: status.progress,
            output_url: status.output_url,
            error: status.error,
        })
    }
}
