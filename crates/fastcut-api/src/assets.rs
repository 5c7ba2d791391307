//! HTTP client for the asset service.
//!
//! The envelope builder only needs two read-only lookups, so this client
//! stays deliberately thin: no retries beyond reqwest's own connection
//! handling, and a 404 maps to `None` rather than an error.

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use fastcut_pipeline::{AssetSource, AudioAsset, PipelineError, PipelineResult, TimedLyrics};

/// Asset service configuration.
#[derive(Debug, Clone)]
pub struct AssetServiceConfig {
    pub base_url: String,
    pub timeout: std::time::Duration,
}

impl Default for AssetServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8300".to_string(),
            timeout: std::time::Duration::from_secs(10),
        }
    }
}

impl AssetServiceConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("ASSET_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8300".to_string()),
            timeout: std::time::Duration::from_secs(
                std::env::var("ASSET_SERVICE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }
}

/// Read-only client over the asset service HTTP API.
pub struct AssetServiceClient {
    http: reqwest::Client,
    config: AssetServiceConfig,
}

impl AssetServiceClient {
    pub fn new(config: AssetServiceConfig) -> PipelineResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PipelineError::Asset(format!("http client: {e}")))?;
        Ok(Self { http, config })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> PipelineResult<Option<T>> {
        let url = format!("{}{}", self.config.base_url, path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| PipelineError::Asset(format!("asset service unreachable: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(PipelineError::Asset(format!(
                "asset service returned {} for {path}",
                response.status()
            )));
        }

        let body = response
            .json()
            .await
            .map_err(|e| PipelineError::Asset(format!("asset service response: {e}")))?;
        Ok(Some(body))
    }
}

#[async_trait]
impl AssetSource for AssetServiceClient {
    async fn audio_asset(&self, asset_id: &str) -> PipelineResult<Option<AudioAsset>> {
        debug!(asset_id, "Fetching audio asset");
        self.get_json(&format!("/v1/assets/{asset_id}")).await
    }

    async fn lyrics(&self, asset_id: &str) -> PipelineResult<Option<TimedLyrics>> {
        debug!(asset_id, "Fetching lyrics");
        self.get_json(&format!("/v1/assets/{asset_id}/lyrics")).await
    }
}
