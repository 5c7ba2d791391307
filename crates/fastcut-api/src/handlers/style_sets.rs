//! Style set listing.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StyleSetSummary {
    pub id: String,
    pub name: String,
    pub vibe: String,
    pub effect_preset: String,
    pub text_style: String,
    pub color_grade: String,
}

#[derive(Debug, Serialize)]
pub struct StyleSetListResponse {
    pub style_sets: Vec<StyleSetSummary>,
}

/// GET /api/style-sets
pub async fn list_style_sets(
    State(state): State<AppState>,
) -> ApiResult<Json<StyleSetListResponse>> {
    let catalog = state.service.catalog();
    let mut style_sets: Vec<StyleSetSummary> = catalog
        .ids()
        .into_iter()
        .filter_map(|id| catalog.get(id))
        .map(|set| StyleSetSummary {
            id: set.id.clone(),
            name: set.name.clone(),
            vibe: set.vibe.as_str().to_string(),
            effect_preset: set.effect_preset.to_string(),
            text_style: set.text_style.as_str().to_string(),
            color_grade: set.color_grade.as_str().to_string(),
        })
        .collect();
    style_sets.sort_by(|a, b| a.id.cmp(&b.id));

    Ok(Json(StyleSetListResponse { style_sets }))
}
