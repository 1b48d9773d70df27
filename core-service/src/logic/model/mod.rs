//! Model Module - scored records and their classification
//!
//! The model itself runs remotely; this module owns what we keep about its
//! answers and how we decide what counts as an anomaly.

pub mod buffer;
pub mod inference;
pub mod record;
pub mod threshold;

// Re-export common types
pub use buffer::{BufferStatus, Page, PredictionBuffer, SortOrder};
pub use inference::{
    InferenceBackend, InferenceClient, InferenceConfig, InferenceError, Prediction, UpstreamHealth,
};
pub use record::{PredictionRecord, RiskLevel};
pub use threshold::{check_threshold, ClassificationSettings, FlagSource, ThresholdError};
