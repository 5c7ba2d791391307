//! Normalized wire types shared by all backend adapters.
//!
//! Every backend accepts the same canonical render request; adapters only
//! differ in transport, endpoint shape and status vocabulary, which they
//! normalize back into [`SubmitAck`] and [`BackendStatus`].

use serde::{Deserialize, Serialize};

use fastcut_models::{AudioTrack, ImageRef, RenderEnvelope, RenderSettings, ScriptLine};

use crate::config::BackendKind;

/// Where the backend should place the finished artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDestination {
    /// Base URI of the artifact store, e.g. `s3://fastcut-renders/outputs`
    pub base_uri: String,
}

impl OutputDestination {
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_uri: std::env::var("OUTPUT_BASE_URI")
                .unwrap_or_else(|_| "s3://fastcut-renders/outputs".to_string()),
        }
    }

    /// Full destination URI for a given job's artifact.
    pub fn for_job(&self, job_id: &str) -> String {
        format!("{}/{}.mp4", self.base_uri.trim_end_matches('/'), job_id)
    }
}

/// The canonical render request, identical for every backend.
///
/// Built from a stored envelope only, never from other system state, so a
/// replayed envelope always serializes to the same payload it produced at
/// first submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub job_id: String,
    /// Pre-sorted by the envelope's authoritative `order` field
    pub images: Vec<ImageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioTrack>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub script: Vec<ScriptLine>,
    pub settings: RenderSettings,
    /// Destination URI for the finished artifact
    pub output: String,
}

impl RenderRequest {
    /// Assemble the wire payload from an envelope.
    pub fn from_envelope(
        job_id: &str,
        envelope: &RenderEnvelope,
        destination: &OutputDestination,
    ) -> Self {
        Self {
            job_id: job_id.to_string(),
            images: envelope.ordered_images().into_iter().cloned().collect(),
            audio: envelope.audio.clone(),
            script: envelope.script.clone(),
            settings: envelope.settings.clone(),
            output: destination.for_job(job_id),
        }
    }
}

/// Normalized submit acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitAck {
    /// Opaque correlation handle for polling; a function call id, a batch
    /// job ARN, whatever the backend hands back
    pub call_id: String,
    /// Which backend accepted the job
    pub backend: BackendKind,
}

/// Backend-side job state, normalized across vocabularies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendJobState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl BackendJobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BackendJobState::Succeeded | BackendJobState::Failed | BackendJobState::Cancelled
        )
    }
}

/// Normalized poll response.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendStatus {
    pub state: BackendJobState,
    pub progress: Option<u8>,
    pub output_url: Option<String>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastcut_models::{AspectRatio, ResolvedStyle, ENVELOPE_VERSION};

    fn envelope() -> RenderEnvelope {
        RenderEnvelope {
            version: ENVELOPE_VERSION,
            images: vec![
                ImageRef {
                    url: "https://cdn.example.com/c.jpg".to_string(),
                    order: 2,
                },
                ImageRef {
                    url: "https://cdn.example.com/a.jpg".to_string(),
                    order: 0,
                },
                ImageRef {
                    url: "https://cdn.example.com/b.jpg".to_string(),
                    order: 1,
                },
            ],
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

    #[test]
    fn test_request_sorts_images_by_order() {
        let dest = OutputDestination::new("s3://bucket/out");
        let request = RenderRequest::from_envelope("job-1", &envelope(), &dest);

        let orders: Vec<u32> = request.images.iter().map(|i| i.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert_eq!(request.output, "s3://bucket/out/job-1.mp4");
    }

    #[test]
    fn test_replayed_envelope_produces_identical_payload() {
        let dest = OutputDestination::new("s3://bucket/out");
        let envelope = envelope();

        let first = RenderRequest::from_envelope("job-1", &envelope, &dest);
        // Round-trip through storage
        let stored: RenderEnvelope =
            serde_json::from_str(&serde_json::to_string(&envelope).unwrap()).unwrap();
        let replayed = RenderRequest::from_envelope("job-1", &stored, &dest);

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&replayed).unwrap()
        );
    }

    #[test]
    fn test_destination_trailing_slash() {
        let dest = OutputDestination::new("s3://bucket/out/");
        assert_eq!(dest.for_job("j1"), "s3://bucket/out/j1.mp4");
    }
}
