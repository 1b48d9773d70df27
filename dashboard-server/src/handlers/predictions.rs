//! Prediction handlers - listing and manual ingestion

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use sentinel_core::{DisplayRecord, Ingested, Page, RawSample, SortOrder};

use crate::{AppResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<usize>,
    #[serde(default)]
    pub order: SortOrder,
}

/// Feature values typed in by an operator
#[derive(Debug, Serialize, Deserialize)]
pub struct SampleRequest {
    pub features: Map<String, Value>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BatchRequest {
    #[validate(length(min = 1, max = 1000))]
    pub samples: Vec<SampleRequest>,
}

/// List one page of the buffer
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Page<DisplayRecord>> {
    let page = query.page.unwrap_or(1);
    Json(state.session.list(page, query.order))
}

/// Score and store one sample
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<SampleRequest>,
) -> AppResult<(StatusCode, Json<Ingested>)> {
    let ingested = state
        .pipeline
        .ingest(&state.session, RawSample::manual(req.features))
        .await?;

    if ingested.record.is_anomaly {
        tracing::info!(
            "Manual sample {} flagged (error {:.6})",
            ingested.record.id,
            ingested.record.reconstruction_error
        );
    }

    Ok((StatusCode::CREATED, Json(ingested)))
}

/// Score and store several samples with one upstream call
pub async fn create_batch(
    State(state): State<AppState>,
    Json(req): Json<BatchRequest>,
) -> AppResult<(StatusCode, Json<Vec<Ingested>>)> {
    req.validate()?;

    let samples = req
        .samples
        .into_iter()
        .map(|s| RawSample::manual(s.features))
        .collect();

    let ingested = state.pipeline.ingest_batch(&state.session, samples).await?;
    tracing::info!("Ingested batch of {} samples", ingested.len());

    Ok((StatusCode::CREATED, Json(ingested)))
}
