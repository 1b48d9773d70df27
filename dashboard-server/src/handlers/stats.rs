//! Buffer statistics handler

use axum::{extract::State, Json};
use serde::Serialize;

use sentinel_core::logic::model::BufferStatus;
use sentinel_core::logic::response::WebhookStats;
use sentinel_core::{BufferStats, Variant};

use crate::AppState;

#[derive(Serialize)]
pub struct StatsResponse {
    pub variant: Variant,
    pub buffer: BufferStatus,
    pub stats: BufferStats,
    pub alerts: Option<WebhookStats>,
}

pub async fn get(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        variant: state.config.variant,
        buffer: state.session.buffer_status(),
        stats: state.session.stats(),
        alerts: state.pipeline.alerts().map(|notifier| notifier.stats()),
    })
}
