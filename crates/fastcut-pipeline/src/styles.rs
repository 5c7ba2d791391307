//! Style sets and the style resolver.
//!
//! A style set is a named, curated bundle of style parameters. Resolution
//! happens once, at submission time: the envelope stores the resolved
//! settings, never the set id (except as provenance), so later edits to a
//! set cannot change what a retry renders.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use fastcut_models::{ColorGrade, EffectPresetId, ResolvedStyle, TextStyle, Vibe};

use crate::error::{PipelineError, PipelineResult};

/// A curated bundle of style parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleSetDefinition {
    pub id: String,
    pub name: String,
    pub vibe: Vibe,
    pub effect_preset: EffectPresetId,
    pub text_style: TextStyle,
    pub color_grade: ColorGrade,
    /// Curated effect ids; style sets never delegate to the effect LLM
    pub effects: Vec<String>,
}

/// Caller's style selection: a named set, or individual parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StyleInput {
    StyleSet {
        style_set_id: String,
    },
    Custom {
        #[serde(default)]
        vibe: Option<Vibe>,
        #[serde(default)]
        effect_preset: Option<EffectPresetId>,
        #[serde(default)]
        text_style: Option<TextStyle>,
        #[serde(default)]
        color_grade: Option<ColorGrade>,
        #[serde(default)]
        use_ai_effects: bool,
        #[serde(default)]
        ai_prompt: Option<String>,
        #[serde(default)]
        ai_effects: Vec<String>,
    },
}

impl Default for StyleInput {
    fn default() -> Self {
        StyleInput::Custom {
            vibe: None,
            effect_preset: None,
            text_style: None,
            color_grade: None,
            use_ai_effects: false,
            ai_prompt: None,
            ai_effects: Vec::new(),
        }
    }
}

/// Lookup table of style sets.
pub struct StyleCatalog {
    sets: HashMap<String, StyleSetDefinition>,
}

impl StyleCatalog {
    /// Empty catalog.
    pub fn new() -> Self {
        Self {
            sets: HashMap::new(),
        }
    }

    /// Catalog pre-loaded with the built-in curated sets.
    pub fn with_builtin_sets() -> Self {
        let mut catalog = Self::new();
        for set in builtin_sets() {
            catalog.insert(set);
        }
        catalog
    }

    pub fn insert(&mut self, set: StyleSetDefinition) {
        self.sets.insert(set.id.clone(), set);
    }

    pub fn get(&self, id: &str) -> Option<&StyleSetDefinition> {
        self.sets.get(id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.sets.keys().map(String::as_str).collect()
    }
}

impl Default for StyleCatalog {
    fn default() -> Self {
        Self::with_builtin_sets()
    }
}

fn builtin_sets() -> Vec<StyleSetDefinition> {
    vec![
        StyleSetDefinition {
            id: "energetic_pop".to_string(),
            name: "Energetic Pop".to_string(),
            vibe: Vibe::Exciting,
            effect_preset: EffectPresetId::from("beat_sync_v2"),
            text_style: TextStyle::Karaoke,
            color_grade: ColorGrade::HighContrast,
            effects: vec![
                "zoom_pulse".to_string(),
                "flash_cut".to_string(),
                "shake_light".to_string(),
            ],
        },
        StyleSetDefinition {
            id: "moody_acoustic".to_string(),
            name: "Moody Acoustic".to_string(),
            vibe: Vibe::Chill,
            effect_preset: EffectPresetId::from("slow_dissolve_v1"),
            text_style: TextStyle::Minimal,
            color_grade: ColorGrade::Warm,
            effects: vec!["grain_overlay".to_string(), "slow_pan".to_string()],
        },
        StyleSetDefinition {
            id: "street_hype".to_string(),
            name: "Street Hype".to_string(),
            vibe: Vibe::Dramatic,
            effect_preset: EffectPresetId::from("hard_cut_v3"),
            text_style: TextStyle::Bold,
            color_grade: ColorGrade::HighContrast,
            effects: vec![
                "glitch_burst".to_string(),
                "speed_ramp".to_string(),
                "rgb_split".to_string(),
            ],
        },
        StyleSetDefinition {
            id: "dreamy_indie".to_string(),
            name: "Dreamy Indie".to_string(),
            vibe: Vibe::Playful,
            effect_preset: EffectPresetId::from("float_fade_v1"),
            text_style: TextStyle::Outline,
            color_grade: ColorGrade::Vintage,
            effects: vec!["soft_blur".to_string(), "light_leak".to_string()],
        },
    ]
}

/// Resolve a style selection into concrete settings.
///
/// A found style set always forces `use_ai_effects = false`: sets bundle
/// curated effect lists, not LLM-selected ones. With individual parameters,
/// every omitted field takes its documented default, so no field of the
/// result is ever undefined.
pub fn resolve(catalog: &StyleCatalog, input: &StyleInput) -> PipelineResult<ResolvedStyle> {
    match input {
        StyleInput::StyleSet { style_set_id } => {
            let set = catalog
                .get(style_set_id)
                .ok_or_else(|| PipelineError::InvalidStyleSet(style_set_id.clone()))?;

            Ok(ResolvedStyle {
                vibe: set.vibe,
                effect_preset: set.effect_preset.clone(),
                text_style: set.text_style,
                color_grade: set.color_grade,
                use_ai_effects: false,
                ai_prompt: None,
                ai_effects: set.effects.clone(),
            })
        }
        StyleInput::Custom {
            vibe,
            effect_preset,
            text_style,
            color_grade,
            use_ai_effects,
            ai_prompt,
            ai_effects,
        } => Ok(ResolvedStyle {
            vibe: vibe.unwrap_or_default(),
            effect_preset: effect_preset.clone().unwrap_or_default(),
            text_style: text_style.unwrap_or_default(),
            color_grade: color_grade.unwrap_or_default(),
            use_ai_effects: *use_ai_effects,
            ai_prompt: ai_prompt.clone(),
            ai_effects: ai_effects.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_set_resolution_disables_ai_effects() {
        let catalog = StyleCatalog::with_builtin_sets();
        let style = resolve(
            &catalog,
            &StyleInput::StyleSet {
                style_set_id: "energetic_pop".to_string(),
            },
        )
        .unwrap();

        assert!(!style.use_ai_effects);
        assert_eq!(style.vibe, Vibe::Exciting);
        assert_eq!(style.text_style, TextStyle::Karaoke);
        assert!(!style.ai_effects.is_empty());
    }

    #[test]
    fn test_unknown_style_set_is_invalid() {
        let catalog = StyleCatalog::with_builtin_sets();
        let err = resolve(
            &catalog,
            &StyleInput::StyleSet {
                style_set_id: "does_not_exist".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidStyleSet(_)));
    }

    #[test]
    fn test_custom_input_falls_back_to_defaults() {
        let catalog = StyleCatalog::new();
        let style = resolve(&catalog, &StyleInput::default()).unwrap();

        assert_eq!(style.vibe, Vibe::Exciting);
        assert_eq!(style.effect_preset.as_str(), EffectPresetId::DEFAULT);
        assert_eq!(style.text_style, TextStyle::Bold);
        assert_eq!(style.color_grade, ColorGrade::None);
        assert!(!style.use_ai_effects);
    }

    #[test]
    fn test_custom_input_passes_through_ai_effects() {
        let catalog = StyleCatalog::new();
        let style = resolve(
            &catalog,
            &StyleInput::Custom {
                vibe: Some(Vibe::Dark),
                effect_preset: None,
                text_style: None,
                color_grade: None,
                use_ai_effects: true,
                ai_prompt: Some("match the drum fills".to_string()),
                ai_effects: vec!["strobe".to_string()],
            },
        )
        .unwrap();

        assert!(style.use_ai_effects);
        assert_eq!(style.vibe, Vibe::Dark);
        assert_eq!(style.ai_effects, vec!["strobe".to_string()]);
    }

    #[test]
    fn test_style_input_deserializes_set_form() {
        let input: StyleInput =
            serde_json::from_str(r#"{"style_set_id": "energetic_pop"}"#).unwrap();
        assert!(matches!(input, StyleInput::StyleSet { .. }));
    }

    #[test]
    fn test_style_input_deserializes_custom_form() {
        let input: StyleInput = serde_json::from_str(r#"{"vibe": "chill"}"#).unwrap();
        match input {
            StyleInput::Custom { vibe, .. } => assert_eq!(vibe, Some(Vibe::Chill)),
            other => panic!("unexpected variant: {:?}", other),
        }
    }
}
