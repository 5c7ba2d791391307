//! Render job record and status enum.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::envelope::RenderEnvelope;

/// Unique identifier for a render job.
///
/// Doubles as the correlation key with the render backend, so callers may
/// supply their own id for idempotent resubmission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RenderJobId(pub String);

impl RenderJobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RenderJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RenderJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RenderJobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Canonical render job lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum RenderStatus {
    /// Persisted, not yet accepted by a backend
    #[default]
    Pending,
    /// Accepted by a backend, render in flight
    Processing,
    /// Render finished, output available
    Completed,
    /// Render failed; retryable from the stored envelope
    Failed,
    /// Cancelled while in flight
    Cancelled,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::Pending => "pending",
            RenderStatus::Processing => "processing",
            RenderStatus::Completed => "completed",
            RenderStatus::Failed => "failed",
            RenderStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal states accept no further transitions.
    ///
    /// Failed is deliberately not terminal: a failed job may be retried.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RenderStatus::Completed | RenderStatus::Cancelled)
    }

    /// Only failed jobs qualify for retry-from-stored-envelope.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RenderStatus::Failed)
    }
}

impl fmt::Display for RenderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The persisted generation record: single source of truth for a render
/// job's lifecycle. Only the generation store mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderJob {
    /// Unique job ID
    pub id: RenderJobId,

    /// Owning campaign; None for quick-create jobs owned only by their creator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,

    /// Lifecycle status
    #[serde(default)]
    pub status: RenderStatus,

    /// Progress 0-100, advanced monotonically by reconciliation
    #[serde(default)]
    pub progress: u8,

    /// The full replayable job description
    pub envelope: RenderEnvelope,

    /// Opaque handle returned by the render backend, used for polling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_call_id: Option<String>,

    /// Final artifact location once completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_url: Option<String>,

    /// Location of the output with post-compose steps applied, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composed_output_url: Option<String>,

    /// Human-readable cause for the most recent failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Number of retry submissions attempted
    #[serde(default)]
    pub retry_count: u32,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl RenderJob {
    /// Create a new pending job around an envelope.
    pub fn new(id: RenderJobId, campaign_id: Option<String>, envelope: RenderEnvelope) -> Self {
        let now = Utc::now();
        Self {
            id,
            campaign_id,
            status: RenderStatus::Pending,
            progress: 0,
            envelope,
            backend_call_id: None,
            output_url: None,
            composed_output_url: None,
            error_message: None,
            retry_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
