//! Session Module - shared state of one running monitor
//!
//! A `Session` owns the prediction buffer and the classification settings.
//! It is shared by reference (`Arc<Session>` in the server); every lock is
//! taken for a single synchronous step and never held across an `.await`.

mod pipeline;

#[cfg(test)]
pub(crate) mod mocks;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BUFFER_CAPACITY, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::logic::model::{
    BufferStatus, ClassificationSettings, Page, PredictionBuffer, PredictionRecord, RiskLevel,
    SortOrder, ThresholdError,
};
use crate::logic::stats::BufferStats;

pub use pipeline::{IngestError, Ingested, Pipeline, SyncWarning};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// A listed record plus the values derived from the current settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRecord {
    #[serde(flatten)]
    pub record: PredictionRecord,
    pub risk_level: RiskLevel,
    pub exceeds_current_threshold: bool,
    pub highlight: bool,
}

/// Partial settings change; absent fields stay as they are
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub alerts_enabled: Option<bool>,
    #[serde(default)]
    pub highlight_anomalies: Option<bool>,
}

// ============================================================================
// SESSION
// ============================================================================

pub struct Session {
    buffer: RwLock<PredictionBuffer>,
    settings: RwLock<ClassificationSettings>,
    page_size: usize,
}

impl Session {
    /// `page_size` is clamped into `1..=MAX_PAGE_SIZE`
    pub fn new(capacity: usize, page_size: usize, settings: ClassificationSettings) -> Self {
        Self {
            buffer: RwLock::new(PredictionBuffer::new(capacity)),
            settings: RwLock::new(settings),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// One page of the buffer, annotated with the current threshold
    pub fn list(&self, page: usize, order: SortOrder) -> Page<DisplayRecord> {
        let settings = self.settings();
        let buffer = self.buffer.read();

        buffer.list(page, self.page_size, order).map(|record| {
            let exceeds = record.exceeds(settings.threshold);
            DisplayRecord {
                record: record.clone(),
                risk_level: record.risk_level(),
                exceeds_current_threshold: exceeds,
                highlight: settings.highlight_anomalies && exceeds,
            }
        })
    }

    /// The `n` most recent arrivals, oldest first
    pub fn latest(&self, n: usize) -> Vec<PredictionRecord> {
        self.buffer.read().latest(n).into_iter().cloned().collect()
    }

    pub fn threshold(&self) -> f64 {
        self.settings.read().threshold
    }

    /// Replace the cutoff for later classifications
    ///
    /// Stored records keep the flag they were ingested with.
    pub fn set_threshold(&self, value: f64) -> Result<(), ThresholdError> {
        self.settings.write().set_threshold(value)?;
        log::info!("Anomaly threshold set to {}", value);
        Ok(())
    }

    /// Snapshot of the current settings
    pub fn settings(&self) -> ClassificationSettings {
        self.settings.read().clone()
    }

    /// Apply a partial update; nothing changes if the threshold is invalid
    pub fn update_settings(&self, update: SettingsUpdate) -> Result<ClassificationSettings, ThresholdError> {
        let mut settings = self.settings.write();

        let mut next = settings.clone();
        if let Some(threshold) = update.threshold {
            next.set_threshold(threshold)?;
        }
        if let Some(enabled) = update.alerts_enabled {
            next.alerts_enabled = enabled;
        }
        if let Some(highlight) = update.highlight_anomalies {
            next.highlight_anomalies = highlight;
        }

        *settings = next.clone();
        Ok(next)
    }

    pub fn stats(&self) -> BufferStats {
        let threshold = self.threshold();
        BufferStats::compute(self.buffer.read().iter(), threshold)
    }

    pub fn buffer_status(&self) -> BufferStatus {
        self.buffer.read().status()
    }

    pub fn len(&self) -> usize {
        self.buffer.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.read().is_empty()
    }

    fn append(&self, record: PredictionRecord) -> Vec<PredictionRecord> {
        self.buffer.write().push(record)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(
            DEFAULT_BUFFER_CAPACITY,
            DEFAULT_PAGE_SIZE,
            ClassificationSettings::default(),
        )
    }
}
