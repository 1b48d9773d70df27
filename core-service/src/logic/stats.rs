//! Buffer statistics
//!
//! Aggregates over the in-memory buffer. Stored flags and the current
//! threshold are reported separately because they can disagree after the
//! threshold moves.

use std::collections::HashMap;

use serde::Serialize;

use crate::constants::TOP_SOURCES_LIMIT;
use crate::logic::journal::SourceCount;
use crate::logic::model::{PredictionRecord, RiskLevel};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskCount {
    pub level: RiskLevel,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BufferStats {
    pub total: usize,
    /// Records flagged at ingestion
    pub stored_anomalies: usize,
    /// Records at or above the current threshold
    pub above_current_threshold: usize,
    pub current_threshold: f64,
    /// Percent of records below the current threshold
    pub pass_rate: f64,
    /// Percent of records flagged at ingestion
    pub detection_rate: f64,
    pub mean_error: Option<f64>,
    pub max_error: Option<f64>,
    pub risk_distribution: Vec<RiskCount>,
    /// Most frequent sources among stored anomalies
    pub top_sources: Vec<SourceCount>,
}

impl BufferStats {
    pub fn compute<'a>(records: impl IntoIterator<Item = &'a PredictionRecord>, threshold: f64) -> Self {
        let mut total = 0;
        let mut stored_anomalies = 0;
        let mut above = 0;
        let mut sum = 0.0;
        let mut max: Option<f64> = None;
        let mut risk: HashMap<RiskLevel, usize> = HashMap::new();
        let mut sources: HashMap<&str, usize> = HashMap::new();

        for record in records {
            total += 1;
            sum += record.reconstruction_error;
            max = Some(max.map_or(record.reconstruction_error, |m| m.max(record.reconstruction_error)));
            *risk.entry(record.risk_level()).or_default() += 1;

            if record.exceeds(threshold) {
                above += 1;
            }
            if record.is_anomaly {
                stored_anomalies += 1;
                if let Some(ip) = record.source_ip() {
                    *sources.entry(ip).or_default() += 1;
                }
            }
        }

        let percent = |n: usize| if total == 0 { 0.0 } else { n as f64 / total as f64 * 100.0 };

        let mut top_sources: Vec<SourceCount> = sources
            .into_iter()
            .map(|(ip, count)| SourceCount {
                source_ip: ip.to_string(),
                count,
            })
            .collect();
        top_sources.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.source_ip.cmp(&b.source_ip)));
        top_sources.truncate(TOP_SOURCES_LIMIT);

        Self {
            total,
            stored_anomalies,
            above_current_threshold: above,
            current_threshold: threshold,
            pass_rate: percent(total - above),
            detection_rate: percent(stored_anomalies),
            mean_error: (total > 0).then(|| sum / total as f64),
            max_error: max,
            risk_distribution: RiskLevel::all()
                .into_iter()
                .map(|level| RiskCount {
                    level,
                    count: risk.get(&level).copied().unwrap_or(0),
                })
                .collect(),
            top_sources,
        }
    }
}
