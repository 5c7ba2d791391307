//! The render envelope: a self-contained, replayable description of a job.
//!
//! Everything a render needs is captured here at submission time. A retry
//! resubmits this structure verbatim, so it must never reference mutable
//! upstream state (style sets, campaign rows) that could change or disappear.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::settings::RenderSettings;

/// Current envelope format version.
///
/// Bumped when the wire shape changes in a way the render backends must
/// distinguish. Envelopes persisted before versioning was introduced
/// deserialize as version 1.
pub const ENVELOPE_VERSION: u32 = 2;

fn legacy_version() -> u32 {
    1
}

/// A single source image with its authoritative position in the cut.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ImageRef {
    pub url: String,
    /// Authoritative sequencing. Array position is never trusted; consumers
    /// re-sort by this field.
    pub order: u32,
}

/// Audio reference with the window of the track to use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AudioTrack {
    pub url: String,
    /// Offset into the source track, seconds
    #[serde(default)]
    pub start_time: f64,
    /// Length of audio to use, seconds
    pub duration: f64,
}

/// One subtitle/lyric line, timed relative to the start of the video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScriptLine {
    pub text: String,
    /// Appearance time, seconds from video start
    pub timing: f64,
    /// Display duration, seconds
    pub duration: f64,
}

/// Optional publish metadata carried opaquely through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct SeoMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

/// The persisted job description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderEnvelope {
    /// Envelope format version (see [`ENVELOPE_VERSION`])
    #[serde(default = "legacy_version")]
    pub version: u32,

    /// Source images; order is carried per-image, not by array position
    pub images: Vec<ImageRef>,

    /// Absent audio means a silent render
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioTrack>,

    /// Subtitle/lyric lines; empty is valid
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub script: Vec<ScriptLine>,

    /// Fully resolved settings (never a style-set reference)
    pub settings: RenderSettings,

    /// Provenance only: which style set produced `settings`, if any.
    /// Never re-resolved on retry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_set_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo: Option<SeoMetadata>,
}

impl RenderEnvelope {
    /// Images sorted by their `order` field. This is the only sequence the
    /// renderer may consume.
    pub fn ordered_images(&self) -> Vec<&ImageRef> {
        let mut refs: Vec<&ImageRef> = self.images.iter().collect();
        refs.sort_by_key(|i| i.order);
        refs
    }

    /// True when the render has no audio track.
    pub fn is_silent(&self) -> bool {
        self.audio.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{AspectRatio, RenderSettings, ResolvedStyle};

    fn settings() -> RenderSettings {
        RenderSettings::from_style(ResolvedStyle::default(), AspectRatio::PORTRAIT, 30.0)
    }

    fn image(url: &str, order: u32) -> ImageRef {
        ImageRef {
            url: url.to_string(),
            order,
        }
    }

    #[test]
    fn test_ordered_images_ignores_array_position() {
        let envelope = RenderEnvelope {
            version: ENVELOPE_VERSION,
            images: vec![image("c", 2), image("a", 0), image("b", 1)],
            audio: None,
            script: Vec::new(),
            settings: settings(),
            style_set_id: None,
            seo: None,
        };

        let ordered: Vec<&str> = envelope
            .ordered_images()
            .iter()
            .map(|i| i.url.as_str())
            .collect();
        assert_eq!(ordered, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_legacy_envelope_defaults_to_version_one() {
        // Serialized before the version field existed
        let json = serde_json::json!({
            "images": [{"url": "https://cdn.example.com/a.jpg", "order": 0}],
            "settings": settings(),
        });

        let envelope: RenderEnvelope = serde_json::from_value(json).unwrap();
        assert_eq!(envelope.version, 1);
        assert!(envelope.is_silent());
        assert!(envelope.script.is_empty());
    }

    #[test]
    fn test_envelope_roundtrip_is_verbatim() {
        let envelope = RenderEnvelope {
            version: ENVELOPE_VERSION,
            images: vec![image("a", 1), image("b", 0)],
            audio: Some(AudioTrack {
                url: "https://cdn.example.com/track.mp3".to_string(),
                start_time: 12.5,
                duration: 30.0,
            }),
            script: vec![ScriptLine {
                text: "first line".to_string(),
                timing: 0.0,
                duration: 2.0,
            }],
            settings: settings(),
            style_set_id: Some("energetic_pop".to_string()),
            seo: None,
        };

        let json = serde_json::to_string(&envelope).unwrap();
        let back: RenderEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, envelope);
    }
}
