//! Batch compute adapter.
//!
//! Submits render jobs to a batch cluster and polls via a describe call. The
//! returned job ARN is treated as the opaque call id. Batch workers read
//! source assets with infrastructure credentials, which is why this backend
//! requires unsigned storage URLs (see `BackendKind::requires_unsigned_urls`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use fastcut_models::RenderEnvelope;

use crate::client::{build_http, check_response, with_retry, RenderBackend};
use crate::config::{BackendConfig, BackendKind};
use crate::error::{BackendError, BackendResult};
use crate::wire::{BackendJobState, BackendStatus, OutputDestination, RenderRequest, SubmitAck};

pub struct BatchBackend {
    http: reqwest::Client,
    config: BackendConfig,
}

#[derive(Debug, Serialize)]
struct SubmitJobBody {
    #[serde(rename = "jobName")]
    job_name: String,
    parameters: RenderRequest,
}

#[derive(Debug, Deserialize)]
struct SubmitJobResponse {
    #[serde(rename = "jobArn")]
    job_arn: String,
}

#[derive(Debug, Serialize)]
struct DescribeJobsBody {
    jobs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DescribeJobsResponse {
    jobs: Vec<JobDetail>,
}

#[derive(Debug, Deserialize)]
struct JobDetail {
    status: String,
    #[serde(rename = "statusReason", default)]
    status_reason: Option<String>,
    #[serde(rename = "outputUrl", default)]
    output_url: Option<String>,
}

impl BatchBackend {
    pub fn new(config: BackendConfig) -> BackendResult<Self> {
        let http = build_http(&config)?;
        Ok(Self { http, config })
    }

    fn map_state(status: &str) -> BackendResult<BackendJobState> {
        match status {
            "SUBMITTED" | "PENDING" | "RUNNABLE" => Ok(BackendJobState::Queued),
            "STARTING" | "RUNNING" => Ok(BackendJobState::Running),
            "SUCCEEDED" => Ok(BackendJobState::Succeeded),
            "FAILED" => Ok(BackendJobState::Failed),
            other => Err(BackendError::invalid_response(format!(
                "unknown batch job status: {}",
                other
            ))),
        }
    }
}

#[async_trait]
impl RenderBackend for BatchBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Batch
    }

    async fn submit(
        &self,
        job_id: &str,
        envelope: &RenderEnvelope,
        output: &OutputDestination,
    ) -> BackendResult<SubmitAck> {
        let body = SubmitJobBody {
            job_name: format!("fastcut-{}", job_id),
            parameters: RenderRequest::from_envelope(job_id, envelope, output),
        };
        let url = format!("{}/v1/submitjob", self.config.base_url);

        debug!(job_id, "Submitting render to batch backend");

        let response = with_retry(self.config.max_retries, "batch submit", || async {
            let resp = self.http.post(&url).json(&body).send().await?;
            check_response(resp).await
        })
        .await?;

        let ack: SubmitJobResponse = response.json().await?;
        Ok(SubmitAck {
            call_id: ack.job_arn,
            backend: BackendKind::Batch,
        })
    }

    async fn poll_status(&self, call_id: &str) -> BackendResult<BackendStatus> {
        let body = DescribeJobsBody {
            jobs: vec![call_id.to_string()],
        };
        let url = format!("{}/v1/describejobs", self.config.base_url);

        let response = with_retry(self.config.max_retries, "batch poll", || async {
            let resp = self.http.post(&url).json(&body).send().await?;
            check_response(resp).await
        })
        .await?;

        let described: DescribeJobsResponse = response.json().await?;
        let detail = described
            .jobs
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::invalid_response("describe returned no jobs"))?;

        Ok(BackendStatus {
            state: Self::map_state(&detail.status)?,
            // Batch reports no incremental progress
            progress: None,
            output_url: detail.output_url,
            error: detail.status_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastcut_models::{
        AspectRatio, ImageRef, RenderSettings, ResolvedStyle, ENVELOPE_VERSION,
    };
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn envelope() -> RenderEnvelope {
        RenderEnvelope {
            version: ENVELOPE_VERSION,
            images: vec![ImageRef {
                url: "https://cdn.example.com/a.jpg".to_string(),
                order: 0,
            }],
            audio: None,
            script: Vec::new(),
            settings: RenderSettings::from_style(
                ResolvedStyle::default(),
                AspectRatio::PORTRAIT,
                30.0,
            ),
            style_set_id: None,
            seo: None,
        }
    }

    fn backend(base_url: &str) -> BatchBackend {
        BatchBackend::new(BackendConfig {
            base_url: base_url.to_string(),
            max_retries: 0,
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_submit_uses_arn_as_call_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/submitjob"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jobArn": "arn:batch:job/abc",
                "jobName": "fastcut-job-1",
            })))
            .mount(&server)
            .await;

        let ack = backend(&server.uri())
            .submit(
                "job-1",
                &envelope(),
                &OutputDestination::new("s3://bucket/out"),
            )
            .await
            .unwrap();
        assert_eq!(ack.call_id, "arn:batch:job/abc");
        assert_eq!(ack.backend, BackendKind::Batch);
    }

    #[tokio::test]
    async fn test_poll_maps_batch_vocabulary() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/describejobs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jobs": [{"status": "RUNNABLE"}],
            })))
            .mount(&server)
            .await;

        let status = backend(&server.uri())
            .poll_status("arn:batch:job/abc")
            .await
            .unwrap();
        assert_eq!(status.state, BackendJobState::Queued);
        assert!(status.progress.is_none());
    }

    #[tokio::test]
    async fn test_poll_succeeded_without_output_url() {
        // The reconciler turns this into an IncompleteCompletion failure;
        // the adapter just reports what the backend said.
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/describejobs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jobs": [{"status": "SUCCEEDED"}],
            })))
            .mount(&server)
            .await;

        let status = backend(&server.uri())
            .poll_status("arn:batch:job/abc")
            .await
            .unwrap();
        assert_eq!(status.state, BackendJobState::Succeeded);
        assert!(status.output_url.is_none());
    }

    #[tokio::test]
    async fn test_poll_empty_describe_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/describejobs"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"jobs": []})),
            )
            .mount(&server)
            .await;

        let err = backend(&server.uri())
            .poll_status("arn:batch:job/abc")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidResponse(_)));
    }
}
