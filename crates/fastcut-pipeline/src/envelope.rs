//! Envelope assembly.
//!
//! Builds the self-contained job description from caller inputs and resolved
//! settings. The builder is pure apart from two asset-store reads (audio
//! track, stored lyrics); it never submits and never persists.

use tracing::{debug, warn};
use url::Url;

use fastcut_models::{
    AspectRatio, AudioTrack, ImageRef, RenderEnvelope, RenderSettings, ResolvedStyle, ScriptLine,
    SeoMetadata, ENVELOPE_VERSION,
};

use crate::assets::{AssetSource, TimedLyrics};
use crate::error::{PipelineError, PipelineResult};

/// A fast cut needs at least two images to cut between.
pub const MIN_IMAGES: usize = 2;

/// Caller-supplied inputs for one envelope.
#[derive(Debug, Clone)]
pub struct EnvelopeInputs {
    /// Images with explicit `order`; array position is not trusted
    pub images: Vec<ImageRef>,
    pub audio_asset_id: Option<String>,
    /// Offset into the source track, seconds
    pub audio_start_time: f64,
    /// Explicit subtitle lines; wins over lyric derivation when present
    pub explicit_script: Option<Vec<ScriptLine>>,
    /// Derive the script from stored lyrics when no explicit script is given
    pub use_audio_lyrics: bool,
    pub aspect_ratio: AspectRatio,
    /// Target video length, seconds
    pub target_duration: f64,
    pub style_set_id: Option<String>,
    pub seo: Option<SeoMetadata>,
}

/// Where the script lines in a built envelope came from.
///
/// "No lyrics available" is a legitimate outcome, but it is reported
/// explicitly rather than leaving callers to guess why the script is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptSource {
    /// Caller supplied the script lines
    Explicit,
    /// Lines derived from stored time-aligned lyrics
    DerivedFromLyrics,
    /// Derivation was requested but no lyrics are stored for the asset
    NoLyricsAvailable,
    /// No script was requested
    None,
}

/// A built envelope plus provenance of its script.
#[derive(Debug, Clone)]
pub struct BuiltEnvelope {
    pub envelope: RenderEnvelope,
    pub script_source: ScriptSource,
}

/// Strip query-string signing parameters from a storage URL.
///
/// Backends that read assets with infrastructure credentials parse the
/// storage key out of the path; a leftover `?X-Signature=...` makes them
/// misparse the key. Non-URL strings pass through unchanged.
pub fn sanitize_storage_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.into()
        }
        Err(_) => raw.split('?').next().unwrap_or(raw).to_string(),
    }
}

/// Build a render envelope from caller inputs.
///
/// `sanitize_urls` is set when the selected backend requires unsigned
/// storage URLs; image and audio URLs then have signing parameters
/// stripped before they enter the envelope.
pub async fn build_envelope(
    assets: &dyn AssetSource,
    style: ResolvedStyle,
    inputs: EnvelopeInputs,
    sanitize_urls: bool,
) -> PipelineResult<BuiltEnvelope> {
    if inputs.images.len() < MIN_IMAGES {
        return Err(PipelineError::missing_input(format!(
            "at least {} images are required, got {}",
            MIN_IMAGES,
            inputs.images.len()
        )));
    }
    if inputs.target_duration <= 0.0 {
        return Err(PipelineError::missing_input(
            "target_duration must be positive",
        ));
    }

    let images: Vec<ImageRef> = inputs
        .images
        .into_iter()
        .map(|img| ImageRef {
            url: if sanitize_urls {
                sanitize_storage_url(&img.url)
            } else {
                img.url
            },
            order: img.order,
        })
        .collect();

    let audio = match &inputs.audio_asset_id {
        Some(asset_id) => {
            let asset = assets
                .audio_asset(asset_id)
                .await?
                .ok_or_else(|| PipelineError::Asset(format!("audio asset not found: {asset_id}")))?;
            Some(AudioTrack {
                url: if sanitize_urls {
                    sanitize_storage_url(&asset.url)
                } else {
                    asset.url
                },
                start_time: inputs.audio_start_time,
                duration: inputs.target_duration,
            })
        }
        None => None,
    };

    let (script, script_source) = match (&inputs.explicit_script, inputs.use_audio_lyrics) {
        (Some(lines), _) => (lines.clone(), ScriptSource::Explicit),
        (None, true) => match &inputs.audio_asset_id {
            Some(asset_id) => match assets.lyrics(asset_id).await? {
                Some(lyrics) => {
                    let lines = derive_script(
                        &lyrics,
                        inputs.audio_start_time,
                        inputs.target_duration,
                    );
                    debug!(
                        asset_id,
                        line_count = lines.len(),
                        "Derived script from stored lyrics"
                    );
                    (lines, ScriptSource::DerivedFromLyrics)
                }
                None => {
                    warn!(asset_id, "Lyrics requested but none stored; script left empty");
                    (Vec::new(), ScriptSource::NoLyricsAvailable)
                }
            },
            None => (Vec::new(), ScriptSource::NoLyricsAvailable),
        },
        (None, false) => (Vec::new(), ScriptSource::None),
    };

    let envelope = RenderEnvelope {
        version: ENVELOPE_VERSION,
        images,
        audio,
        script,
        settings: RenderSettings::from_style(style, inputs.aspect_ratio, inputs.target_duration),
        style_set_id: inputs.style_set_id,
        seo: inputs.seo,
    };

    Ok(BuiltEnvelope {
        envelope,
        script_source,
    })
}

/// Convert time-aligned lyrics into video-relative script lines.
///
/// Keeps the segments overlapping the window
/// `[audio_start, audio_start + target_duration)`, shifts timings so the
/// window start becomes zero, and clips display durations to the window end.
fn derive_script(lyrics: &TimedLyrics, audio_start: f64, target_duration: f64) -> Vec<ScriptLine> {
    let window_end = audio_start + target_duration;

    lyrics
        .lines
        .iter()
        .filter(|line| line.end > audio_start && line.start < window_end)
        .map(|line| {
            let start = line.start.max(audio_start);
            let end = line.end.min(window_end);
            ScriptLine {
                text: line.text.clone(),
                timing: start - audio_start,
                duration: end - start,
            }
        })
        .collect()
}
