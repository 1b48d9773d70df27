//! Traffic Sentinel Core
//!
//! Keeps a bounded in-memory history of scored traffic samples, classifies
//! them against an operator-adjustable threshold, and forwards anomalies to a
//! durable log and an alert webhook.
//!
//! ```text
//!  time-series poll ─┐
//!                    ├─► validate ─► inference ─► buffer ─┬─► durable log
//!  manual sample  ───┘                                    └─► webhook alert
//! ```

pub mod constants;
pub mod logic;

pub use logic::features::{FeatureSet, Provenance, RawSample, SampleError, SampleOrigin, Variant};
pub use logic::journal::{AnomalyJournal, JournalEntry, JournalError};
pub use logic::model::{
    ClassificationSettings, FlagSource, InferenceBackend, InferenceClient, InferenceConfig,
    InferenceError, Page, PredictionBuffer, PredictionRecord, RiskLevel, SortOrder,
};
pub use logic::response::{AlertError, AlertPayload, AlertSink, WebhookConfig, WebhookNotifier};
pub use logic::session::{DisplayRecord, IngestError, Ingested, Pipeline, Session, SettingsUpdate, SyncWarning};
pub use logic::stats::BufferStats;
pub use logic::timeseries::{SampleSource, TimeSeriesClient, TimeSeriesConfig};
