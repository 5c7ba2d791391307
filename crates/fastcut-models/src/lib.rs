//! Shared data models for the Fastcut render pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Render jobs and their lifecycle status
//! - The replayable render envelope (images, audio, script, settings)
//! - Resolved style settings
//! - The pure status-transition state machine

pub mod envelope;
pub mod job;
pub mod settings;
pub mod transition;

// Re-export common types
pub use envelope::{
    AudioTrack, ImageRef, RenderEnvelope, ScriptLine, SeoMetadata, ENVELOPE_VERSION,
};
pub use job::{RenderJob, RenderJobId, RenderStatus};
pub use settings::{
    AspectRatio, ColorGrade, EffectPresetId, RenderSettings, ResolvedStyle, TextStyle, Vibe,
};
pub use transition::{evaluate, IgnoreReason, StatusUpdate, Transition};
