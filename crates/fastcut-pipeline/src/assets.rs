//! Read-only asset lookups used by the envelope builder.
//!
//! The builder needs exactly two things from upstream storage: the audio
//! track for a referenced asset id, and (optionally) its time-aligned
//! lyrics. Both are behind a trait so tests can run against an in-memory
//! source.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PipelineResult;

/// A stored audio track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioAsset {
    pub url: String,
    /// Full track length, seconds
    pub duration: f64,
}

/// One time-aligned lyric segment, timed against the source track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricLine {
    pub text: String,
    /// Segment start, seconds from track start
    pub start: f64,
    /// Segment end, seconds from track start
    pub end: f64,
}

/// Time-aligned lyrics for one audio asset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimedLyrics {
    pub lines: Vec<LyricLine>,
}

/// Read-only lookups against the asset store.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Fetch an audio asset by id. `None` when the id is unknown.
    async fn audio_asset(&self, asset_id: &str) -> PipelineResult<Option<AudioAsset>>;

    /// Fetch stored lyrics for an audio asset. `None` when no lyrics exist,
    /// which is a normal outcome, not an error.
    async fn lyrics(&self, asset_id: &str) -> PipelineResult<Option<TimedLyrics>>;
}

/// In-memory asset source for tests and local development.
#[derive(Default)]
pub struct StaticAssetSource {
    audio: HashMap<String, AudioAsset>,
    lyrics: HashMap<String, TimedLyrics>,
}

impl StaticAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_audio(mut self, asset_id: impl Into<String>, asset: AudioAsset) -> Self {
        self.audio.insert(asset_id.into(), asset);
        self
    }

    pub fn with_lyrics(mut self, asset_id: impl Into<String>, lyrics: TimedLyrics) -> Self {
        self.lyrics.insert(asset_id.into(), lyrics);
        self
    }
}

#[async_trait]
impl AssetSource for StaticAssetSource {
    async fn audio_asset(&self, asset_id: &str) -> PipelineResult<Option<AudioAsset>> {
        Ok(self.audio.get(asset_id).cloned())
    }

    async fn lyrics(&self, asset_id: &str) -> PipelineResult<Option<TimedLyrics>> {
        Ok(self.lyrics.get(asset_id).cloned())
    }
}
