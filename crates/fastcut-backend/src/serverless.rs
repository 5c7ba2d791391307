//! Serverless function adapter.
//!
//! Invokes a remote render function and polls its call handle. Uses bearer
//! auth when a token is configured.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use fastcut_models::RenderEnvelope;

use crate::client::{build_http, check_response, with_retry, RenderBackend};
use crate::config::{BackendConfig, BackendKind};
use crate::error::{BackendError, BackendResult};
use crate::wire::{BackendJobState, BackendStatus, OutputDestination, RenderRequest, SubmitAck};

pub struct ServerlessBackend {
    http: reqwest::Client,
    config: BackendConfig,
}

#[derive(Debug, Deserialize)]
struct CallResponse {
    call_id: String,
}

#[derive(Debug, Deserialize)]
struct CallStatusResponse {
    state: String,
    #[serde(default)]
    progress: Option<u8>,
    #[serde(default)]
    result: Option<CallResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallResult {
    #[serde(default)]
    output_url: Option<String>,
}

impl ServerlessBackend {
    pub fn new(config: BackendConfig) -> BackendResult<Self> {
        let http = build_http(&config)?;
        Ok(Self { http, config })
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn map_state(state: &str) -> BackendResult<BackendJobState> {
        match state {
            "PENDING" => Ok(BackendJobState::Queued),
            "RUNNING" => Ok(BackendJobState::Running),
            "SUCCESS" => Ok(BackendJobState::Succeeded),
            "FAILURE" => Ok(BackendJobState::Failed),
            "CANCELLED" => Ok(BackendJobState::Cancelled),
            other => Err(BackendError::invalid_response(format!(
                "unknown function call state: {}",
                other
            ))),
        }
    }
}

#[async_trait]
impl RenderBackend for ServerlessBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Serverless
    }

    async fn submit(
        &self,
        job_id: &str,
        envelope: &RenderEnvelope,
        output: &OutputDestination,
    ) -> BackendResult<SubmitAck> {
        let request = RenderRequest::from_envelope(job_id, envelope, output);
        let url = format!("{}/v1/functions/render_fast_cut/call", self.config.base_url);

        debug!(job_id, "Submitting render to serverless backend");

        let response = with_retry(self.config.max_retries, "serverless submit", || async {
            let resp = self
                .authed(self.http.post(&url))
                .json(&request)
                .send()
                .await?;
            check_response(resp).await
        })
        .await?;

        let ack: CallResponse = response.json().await?;
        Ok(SubmitAck {
            call_id: ack.call_id,
            backend: BackendKind::Serverless,
        })
    }

    async fn poll_status(&self, call_id: &str) -> BackendResult<BackendStatus> {
        let url = format!("{}/v1/calls/{}", self.config.base_url, call_id);

        let response = with_retry(self.config.max_retries, "serverless poll", || async {
            let resp = self.authed(self.http.get(&url)).send().await?;
            check_response(resp).await
        })
        .await?;

        let status: CallStatusResponse = response.json().await?;
        Ok(BackendStatus {
            state: Self::map_state(&status.state)?,
            progress: status.progress,
            output_url: status.result.and_then(|r| r.output_url),
            error: status.error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastcut_models::{
        AspectRatio, ImageRef, RenderSettings, ResolvedStyle, ENVELOPE_VERSION,
    };
    use wiremock::matchers::{header, method, path};
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

    fn backend(base_url: &str) -> ServerlessBackend {
        ServerlessBackend::new(BackendConfig {
            base_url: base_url.to_string(),
            api_token: Some("test-token".to_string()),
            max_retries: 0,
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_submit_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/functions/render_fast_cut/call"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"call_id": "fc-abc123"})),
            )
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
        assert_eq!(ack.call_id, "fc-abc123");
        assert_eq!(ack.backend, BackendKind::Serverless);
    }

    #[tokio::test]
    async fn test_poll_success_carries_output_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/calls/fc-abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "state": "SUCCESS",
                "result": {"output_url": "https://out.example.com/v.mp4"},
            })))
            .mount(&server)
            .await;

        let status = backend(&server.uri()).poll_status("fc-abc123").await.unwrap();
        assert_eq!(status.state, BackendJobState::Succeeded);
        assert_eq!(
            status.output_url.as_deref(),
            Some("https://out.example.com/v.mp4")
        );
    }

    #[tokio::test]
    async fn test_poll_failure_carries_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/calls/fc-abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "state": "FAILURE",
                "error": "ffmpeg exited 1",
            })))
            .mount(&server)
            .await;

        let status = backend(&server.uri()).poll_status("fc-abc123").await.unwrap();
        assert_eq!(status.state, BackendJobState::Failed);
        assert_eq!(status.error.as_deref(), Some("ffmpeg exited 1"));
    }
}
