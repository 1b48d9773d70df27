//! Durable log history handler

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sentinel_core::logic::journal::{parse_window, summarize, HistorySummary, TimeRange};
use sentinel_core::{AnomalyJournal, JournalEntry};

use crate::{AppError, AppResult, AppState};

const DEFAULT_WINDOW: &str = "-24h";

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Relative window such as `-30m`, `-24h` or `-7d`
    pub window: Option<String>,
    /// Preset range; wins over `window`
    pub range: Option<TimeRange>,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub window: String,
    pub since: DateTime<Utc>,
    pub summary: HistorySummary,
    pub entries: Vec<JournalEntry>,
}

pub async fn get(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<HistoryResponse>> {
    let (window, duration) = match query.range {
        Some(range) => (range.window().to_string(), range.duration()),
        None => {
            let window = query.window.unwrap_or_else(|| DEFAULT_WINDOW.to_string());
            let duration = parse_window(&window)?;
            (window, duration)
        }
    };

    let since = Utc::now()
        .checked_sub_signed(duration)
        .ok_or_else(|| AppError::ValidationError(format!("time window '{}' is out of range", window)))?;
    let entries = state.pipeline.journal().since(since).await?;
    let summary = summarize(&entries);

    Ok(Json(HistoryResponse {
        window,
        since,
        summary,
        entries,
    }))
}
