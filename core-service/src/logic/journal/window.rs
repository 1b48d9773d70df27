//! History windows and summaries over durable log rows

use std::collections::HashMap;
use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::JournalEntry;
use crate::constants::{MAX_HISTORY_WINDOW_DAYS, TOP_SOURCES_LIMIT};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("empty time window")]
    Empty,
    #[error("invalid time window '{0}' (expected e.g. -30m, -24h, -7d)")]
    Invalid(String),
    #[error("time window '{0}' is longer than one year")]
    TooLong(String),
}

/// Parse a relative window such as `-24h`, `7d` or `-30m`
///
/// The leading minus is optional. Only minutes, hours and days are accepted,
/// the amount must be positive and the window at most a year.
pub fn parse_window(window: &str) -> Result<Duration, WindowError> {
    let trimmed = window.trim();
    if trimmed.is_empty() {
        return Err(WindowError::Empty);
    }

    let body = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let invalid = || WindowError::Invalid(window.to_string());

    let unit = body.chars().last().ok_or_else(invalid)?;
    let amount: i64 = body[..body.len() - unit.len_utf8()]
        .parse()
        .map_err(|_| invalid())?;
    if amount <= 0 {
        return Err(invalid());
    }

    let duration = match unit {
        'm' => Duration::try_minutes(amount),
        'h' => Duration::try_hours(amount),
        'd' => Duration::try_days(amount),
        _ => return Err(invalid()),
    };

    match duration {
        Some(d) if d <= Duration::days(MAX_HISTORY_WINDOW_DAYS) => Ok(d),
        _ => Err(WindowError::TooLong(window.to_string())),
    }
}

/// Preset history ranges offered to operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "30m")]
    Last30Minutes,
    #[serde(rename = "1h")]
    LastHour,
    #[serde(rename = "24h")]
    Last24Hours,
    #[serde(rename = "7d")]
    Last7Days,
    #[serde(rename = "14d")]
    Last14Days,
    #[serde(rename = "30d")]
    Last30Days,
}

impl TimeRange {
    pub fn all() -> [TimeRange; 6] {
        [
            TimeRange::Last30Minutes,
            TimeRange::LastHour,
            TimeRange::Last24Hours,
            TimeRange::Last7Days,
            TimeRange::Last14Days,
            TimeRange::Last30Days,
        ]
    }

    /// Flux-style relative start, e.g. `-24h`
    pub fn window(&self) -> &'static str {
        match self {
            TimeRange::Last30Minutes => "-30m",
            TimeRange::LastHour => "-1h",
            TimeRange::Last24Hours => "-24h",
            TimeRange::Last7Days => "-7d",
            TimeRange::Last14Days => "-14d",
            TimeRange::Last30Days => "-30d",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeRange::Last30Minutes => "Last 30 min",
            TimeRange::LastHour => "Last 1 hour",
            TimeRange::Last24Hours => "Last 24 hours",
            TimeRange::Last7Days => "Last 7 days",
            TimeRange::Last14Days => "Last 14 days",
            TimeRange::Last30Days => "Last 30 days",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            TimeRange::Last30Minutes => Duration::minutes(30),
            TimeRange::LastHour => Duration::hours(1),
            TimeRange::Last24Hours => Duration::hours(24),
            TimeRange::Last7Days => Duration::days(7),
            TimeRange::Last14Days => Duration::days(14),
            TimeRange::Last30Days => Duration::days(30),
        }
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        TimeRange::Last24Hours
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Requests seen from one source address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCount {
    pub source_ip: String,
    pub count: usize,
}

/// Aggregate view of durable log rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub total_records: usize,
    pub anomaly_count: usize,
    pub average_score: Option<f64>,
    pub top_sources: Vec<SourceCount>,
}

pub fn summarize(entries: &[JournalEntry]) -> HistorySummary {
    let total_records = entries.len();
    let anomaly_count = entries.iter().filter(|e| e.is_anomaly).count();
    let average_score = (total_records > 0)
        .then(|| entries.iter().map(|e| e.anomaly_score).sum::<f64>() / total_records as f64);

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for entry in entries {
        *counts.entry(entry.source_ip.as_str()).or_default() += 1;
    }

    let mut top_sources: Vec<SourceCount> = counts
        .into_iter()
        .map(|(ip, count)| SourceCount {
            source_ip: ip.to_string(),
            count,
        })
        .collect();
    // Highest count first, address as a stable tie-breaker
    top_sources.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.source_ip.cmp(&b.source_ip)));
    top_sources.truncate(TOP_SOURCES_LIMIT);

    HistorySummary {
        total_records,
        anomaly_count,
        average_score,
        top_sources,
    }
}
