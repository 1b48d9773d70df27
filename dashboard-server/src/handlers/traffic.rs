//! Raw time-series traffic handler

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sentinel_core::logic::journal::TimeRange;
use sentinel_core::logic::timeseries::TimeSeriesRow;

use crate::{AppError, AppResult, AppState};

#[derive(Debug, Deserialize)]
pub struct TrafficQuery {
    pub start: Option<DateTime<Utc>>,
    pub stop: Option<DateTime<Utc>>,
    pub range: Option<TimeRange>,
}

#[derive(Serialize)]
pub struct TrafficResponse {
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
    pub count: usize,
    pub rows: Vec<TimeSeriesRow>,
}

/// Rows between `start` and `stop`, or over a preset range ending now
pub async fn get(
    State(state): State<AppState>,
    Query(query): Query<TrafficQuery>,
) -> AppResult<Json<TrafficResponse>> {
    let client = state
        .timeseries
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("Time-series source not configured".to_string()))?;

    let (start, stop) = match (query.start, query.stop) {
        (Some(start), Some(stop)) => (start, stop),
        (None, None) => {
            let stop = Utc::now();
            (stop - query.range.unwrap_or_default().duration(), stop)
        }
        _ => {
            return Err(AppError::ValidationError(
                "start and stop must be given together".to_string(),
            ))
        }
    };

    let rows = client.fetch_range(start, stop).await?;

    Ok(Json(TrafficResponse {
        start,
        stop,
        count: rows.len(),
        rows,
    }))
}
