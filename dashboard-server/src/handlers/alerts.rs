//! Alert webhook handlers

use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::json;

use sentinel_core::logic::response::{DeliveryAttempt, WebhookStats};

use crate::{AppError, AppResult, AppState};

#[derive(Serialize)]
pub struct AlertsResponse {
    pub configured: bool,
    pub enabled: bool,
    pub stats: Option<WebhookStats>,
    pub recent: Vec<DeliveryAttempt>,
}

/// Delivery stats and the most recent attempts
pub async fn get(State(state): State<AppState>) -> Json<AlertsResponse> {
    let notifier = state.pipeline.alerts();

    Json(AlertsResponse {
        configured: notifier.is_some(),
        enabled: state.session.settings().alerts_enabled,
        stats: notifier.map(|n| n.stats()),
        recent: notifier.map(|n| n.history()).unwrap_or_default(),
    })
}

/// Send a test message through the configured webhook
pub async fn test(State(state): State<AppState>) -> AppResult<Json<serde_json::Value>> {
    let notifier = state
        .pipeline
        .alerts()
        .ok_or_else(|| AppError::ServiceUnavailable("Alert webhook not configured".to_string()))?;

    notifier.test().await?;
    tracing::info!("Test alert delivered via {:?}", notifier.platform());

    Ok(Json(json!({ "sent": true })))
}
