//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;

use sentinel_core::logic::model::UpstreamHealth;
use sentinel_core::{InferenceBackend, Variant};

use crate::{AppResult, AppState};

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    variant: Variant,
    buffered: usize,
    live_polling: bool,
    timestamp: i64,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        variant: state.config.variant,
        buffered: state.session.len(),
        live_polling: state.timeseries.is_some(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}

/// Ask the inference endpoint for its health
pub async fn upstream(State(state): State<AppState>) -> AppResult<Json<UpstreamHealth>> {
    let health = state.pipeline.inference().health().await?;
    Ok(Json(health))
}
