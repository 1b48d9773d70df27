//! Durable Anomaly Log
//!
//! Contract for the relational log every anomalous record is written to.
//! One row per anomaly, written once, never batched or deduplicated.
//! The SQL implementation lives with the server that owns the database.

mod window;

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::UNKNOWN_ADDRESS;
use crate::logic::model::PredictionRecord;

pub use window::{parse_window, summarize, HistorySummary, SourceCount, TimeRange, WindowError};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// One durable log row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub source_ip: String,
    pub dest_ip: String,
    pub protocol: String,
    pub anomaly_score: f64,
    pub is_anomaly: bool,
}

impl From<&PredictionRecord> for JournalEntry {
    fn from(record: &PredictionRecord) -> Self {
        Self {
            id: record.id,
            timestamp: record.timestamp,
            source_ip: record.source_ip().unwrap_or(UNKNOWN_ADDRESS).to_string(),
            dest_ip: record.dest_ip().unwrap_or(UNKNOWN_ADDRESS).to_string(),
            protocol: record
                .protocol()
                .unwrap_or_else(|| record.variant.label())
                .to_string(),
            anomaly_score: record.reconstruction_error,
            is_anomaly: record.is_anomaly,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JournalError {
    #[error("durable log unavailable: {0}")]
    Unavailable(String),
    #[error("durable log write failed: {0}")]
    WriteFailed(String),
    #[error("durable log read failed: {0}")]
    ReadFailed(String),
}

// ============================================================================
// JOURNAL TRAIT
// ============================================================================

pub trait AnomalyJournal: Send + Sync {
    /// Insert a single row
    fn append(&self, entry: &JournalEntry) -> impl Future<Output = Result<(), JournalError>> + Send;

    /// Rows with `timestamp >= cutoff`, newest first
    fn since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<JournalEntry>, JournalError>> + Send;
}
