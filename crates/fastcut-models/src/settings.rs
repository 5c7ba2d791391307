//! Render style settings.
//!
//! `RenderSettings` is always stored fully resolved inside the envelope:
//! retries must not depend on style-set definitions that may have changed
//! since the original submission.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Overall pacing/mood of the cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Vibe {
    /// High-energy cuts synced to beat
    #[default]
    Exciting,
    /// Slow transitions, longer holds
    Chill,
    /// Heavy contrast, punch-ins
    Dramatic,
    /// Bouncy motion, stickers-friendly timing
    Playful,
    /// Desaturated, moody pacing
    Dark,
}

impl Vibe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vibe::Exciting => "exciting",
            Vibe::Chill => "chill",
            Vibe::Dramatic => "dramatic",
            Vibe::Playful => "playful",
            Vibe::Dark => "dark",
        }
    }
}

impl fmt::Display for Vibe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Vibe {
    type Err = SettingParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exciting" => Ok(Vibe::Exciting),
            "chill" => Ok(Vibe::Chill),
            "dramatic" => Ok(Vibe::Dramatic),
            "playful" => Ok(Vibe::Playful),
            "dark" => Ok(Vibe::Dark),
            _ => Err(SettingParseError::new("vibe", s)),
        }
    }
}

/// Subtitle/lyric text treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum TextStyle {
    #[default]
    Bold,
    Minimal,
    /// Word-by-word highlight following timing
    Karaoke,
    Outline,
}

impl TextStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextStyle::Bold => "bold",
            TextStyle::Minimal => "minimal",
            TextStyle::Karaoke => "karaoke",
            TextStyle::Outline => "outline",
        }
    }
}

impl fmt::Display for TextStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TextStyle {
    type Err = SettingParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bold" => Ok(TextStyle::Bold),
            "minimal" => Ok(TextStyle::Minimal),
            "karaoke" => Ok(TextStyle::Karaoke),
            "outline" => Ok(TextStyle::Outline),
            _ => Err(SettingParseError::new("text_style", s)),
        }
    }
}

/// Color grade applied across the whole cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ColorGrade {
    #[default]
    None,
    Warm,
    Cool,
    HighContrast,
    Vintage,
}

impl ColorGrade {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorGrade::None => "none",
            ColorGrade::Warm => "warm",
            ColorGrade::Cool => "cool",
            ColorGrade::HighContrast => "high_contrast",
            ColorGrade::Vintage => "vintage",
        }
    }
}

impl fmt::Display for ColorGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ColorGrade {
    type Err = SettingParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(ColorGrade::None),
            "warm" => Ok(ColorGrade::Warm),
            "cool" => Ok(ColorGrade::Cool),
            "high_contrast" => Ok(ColorGrade::HighContrast),
            "vintage" => Ok(ColorGrade::Vintage),
            _ => Err(SettingParseError::new("color_grade", s)),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown {field}: {value}")]
pub struct SettingParseError {
    field: &'static str,
    value: String,
}

impl SettingParseError {
    fn new(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

/// Identifier of a server-defined cut/transition preset.
///
/// Presets are data, not code, so this stays an opaque id rather than an
/// enum that would need a release for every new preset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct EffectPresetId(String);

impl EffectPresetId {
    /// Preset used when the caller specifies nothing.
    pub const DEFAULT: &'static str = "classic_cut_v1";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EffectPresetId {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for EffectPresetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EffectPresetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Target aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    /// Standard portrait (9:16) for TikTok/Reels
    pub const PORTRAIT: AspectRatio = AspectRatio {
        width: 9,
        height: 16,
    };

    /// Square (1:1)
    pub const SQUARE: AspectRatio = AspectRatio {
        width: 1,
        height: 1,
    };

    /// Landscape (16:9)
    pub const LANDSCAPE: AspectRatio = AspectRatio {
        width: 16,
        height: 9,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn as_f64(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::PORTRAIT
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = AspectRatioParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 2 {
            return Err(AspectRatioParseError::InvalidFormat(s.to_string()));
        }

        let width = parts[0]
            .parse()
            .map_err(|_| AspectRatioParseError::InvalidNumber(parts[0].to_string()))?;
        let height = parts[1]
            .parse()
            .map_err(|_| AspectRatioParseError::InvalidNumber(parts[1].to_string()))?;

        if width == 0 || height == 0 {
            return Err(AspectRatioParseError::ZeroValue);
        }

        Ok(AspectRatio { width, height })
    }
}

#[derive(Debug, Error)]
pub enum AspectRatioParseError {
    #[error("Invalid aspect ratio format: {0}, expected 'W:H'")]
    InvalidFormat(String),
    #[error("Invalid number in aspect ratio: {0}")]
    InvalidNumber(String),
    #[error("Aspect ratio cannot have zero values")]
    ZeroValue,
}

/// Output of the style resolver: every field concrete, nothing optional
/// except the free-text AI prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct ResolvedStyle {
    pub vibe: Vibe,
    pub effect_preset: EffectPresetId,
    pub text_style: TextStyle,
    pub color_grade: ColorGrade,
    /// When true the renderer asks the effect LLM to pick per-segment effects
    #[serde(default)]
    pub use_ai_effects: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_prompt: Option<String>,
    /// Concrete effect ids, either curated (style set) or LLM-selected
    #[serde(default)]
    pub ai_effects: Vec<String>,
}

/// Complete render settings as persisted in the envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderSettings {
    pub vibe: Vibe,
    pub effect_preset: EffectPresetId,
    pub text_style: TextStyle,
    pub color_grade: ColorGrade,
    #[serde(default)]
    pub use_ai_effects: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_prompt: Option<String>,
    #[serde(default)]
    pub ai_effects: Vec<String>,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    /// Target video length in seconds
    pub target_duration: f64,
}

impl RenderSettings {
    /// Combine a resolved style with the per-request output parameters.
    pub fn from_style(style: ResolvedStyle, aspect_ratio: AspectRatio, target_duration: f64) -> Self {
        Self {
            vibe: style.vibe,
            effect_preset: style.effect_preset,
            text_style: style.text_style,
            color_grade: style.color_grade,
            use_ai_effects: style.use_ai_effects,
            ai_prompt: style.ai_prompt,
            ai_effects: style.ai_effects,
            aspect_ratio,
            target_duration,
        }
    }
}
