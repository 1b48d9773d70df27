//! Classification settings handlers

use axum::{extract::State, Json};
use serde::Deserialize;
use validator::Validate;

use sentinel_core::{ClassificationSettings, SettingsUpdate};

use crate::{AppResult, AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSettingsRequest {
    #[validate(range(min = 0.0))]
    pub threshold: Option<f64>,
    pub alerts_enabled: Option<bool>,
    pub highlight_anomalies: Option<bool>,
}

pub async fn get(State(state): State<AppState>) -> Json<ClassificationSettings> {
    Json(state.session.settings())
}

/// Change the threshold and toggles
///
/// A new threshold only affects records ingested after the change.
pub async fn update(
    State(state): State<AppState>,
    Json(req): Json<UpdateSettingsRequest>,
) -> AppResult<Json<ClassificationSettings>> {
    req.validate()?;

    let before = state.session.threshold();
    let settings = state.session.update_settings(SettingsUpdate {
        threshold: req.threshold,
        alerts_enabled: req.alerts_enabled,
        highlight_anomalies: req.highlight_anomalies,
    })?;

    if settings.threshold != before {
        tracing::info!("Threshold changed: {} -> {}", before, settings.threshold);
    }

    Ok(Json(settings))
}
