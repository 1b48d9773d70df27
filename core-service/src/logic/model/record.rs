//! Prediction Record - one scored sample

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logic::features::{FeatureSet, Provenance, SampleOrigin, Variant};

/// A scored sample as stored in the buffer
///
/// Never modified after it is appended. `is_anomaly` is the classification
/// made at ingestion time; display code compares `reconstruction_error`
/// against the current threshold instead of rewriting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: Uuid,
    /// Ingestion time
    pub timestamp: DateTime<Utc>,
    /// Time reported by the time-series row, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<DateTime<Utc>>,
    pub variant: Variant,
    pub origin: SampleOrigin,
    pub features: FeatureSet,
    pub reconstruction_error: f64,
    pub is_anomaly: bool,
    pub threshold_at_ingestion: f64,
    /// Flag returned by the inference endpoint, kept for audit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_flag: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

impl PredictionRecord {
    /// Display-time comparison against an arbitrary threshold
    pub fn exceeds(&self, threshold: f64) -> bool {
        self.reconstruction_error >= threshold
    }

    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_score(self.reconstruction_error)
    }

    pub fn source_ip(&self) -> Option<&str> {
        self.provenance.as_ref().and_then(|p| p.source_ip.as_deref())
    }

    pub fn dest_ip(&self) -> Option<&str> {
        self.provenance.as_ref().and_then(|p| p.dest_ip.as_deref())
    }

    pub fn protocol(&self) -> Option<&str> {
        self.provenance.as_ref().and_then(|p| p.protocol.as_deref())
    }
}

/// Coarse risk bucket of a reconstruction error
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            RiskLevel::Critical
        } else if score >= 0.8 {
            RiskLevel::High
        } else if score >= 0.6 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }

    pub fn all() -> [RiskLevel; 4] {
        [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High, RiskLevel::Critical]
    }
}
