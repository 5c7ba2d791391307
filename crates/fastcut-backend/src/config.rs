//! Backend selection and client configuration.
//!
//! The backend is resolved once per deployment from the environment; request
//! paths never choose a backend themselves.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Which compute target performs the render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackendKind {
    /// Render service running alongside the API (dev/single-box)
    #[default]
    Local,
    /// Serverless function invoke endpoint
    Serverless,
    /// Batch compute cluster
    Batch,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::Serverless => "serverless",
            BackendKind::Batch => "batch",
        }
    }

    /// Batch workers authenticate to storage with infrastructure credentials
    /// and parse the object key out of the URL; signed query parameters make
    /// that key resolution fail, so URLs must be stripped before submission.
    pub fn requires_unsigned_urls(&self) -> bool {
        matches!(self, BackendKind::Batch)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = BackendKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(BackendKind::Local),
            "serverless" => Ok(BackendKind::Serverless),
            "batch" => Ok(BackendKind::Batch),
            _ => Err(BackendKindParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown render backend: {0}")]
pub struct BackendKindParseError(String);

/// Configuration for the render backend client.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Selected backend
    pub kind: BackendKind,
    /// Base URL of the backend's HTTP surface
    pub base_url: String,
    /// Bearer token, when the backend requires one
    pub api_token: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Max retries for transient submit/poll failures
    pub max_retries: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Local,
            base_url: "http://localhost:8200".to_string(),
            api_token: None,
            timeout: Duration::from_secs(60),
            max_retries: 2,
        }
    }
}

impl BackendConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            kind: std::env::var("RENDER_BACKEND")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            base_url: std::env::var("RENDER_BACKEND_URL")
                .unwrap_or_else(|_| "http://localhost:8200".to_string()),
            api_token: std::env::var("RENDER_BACKEND_TOKEN").ok(),
            timeout: Duration::from_secs(
                std::env::var("RENDER_BACKEND_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            max_retries: std::env::var("RENDER_BACKEND_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
        }
    }
}
