//! Threshold Configuration
//!
//! Operator-adjustable cutoff on reconstruction error, plus the choice of
//! which authority decides the stored anomaly flag.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_THRESHOLD;

/// Who decides `is_anomaly` for a deployment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagSource {
    /// `reconstruction_error >= threshold` at ingestion time
    #[default]
    Threshold,
    /// The inference endpoint's own anomaly flag
    Endpoint,
}

impl FlagSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagSource::Threshold => "threshold",
            FlagSource::Endpoint => "endpoint",
        }
    }
}

impl fmt::Display for FlagSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlagSource {
    type Err = ThresholdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "threshold" => Ok(FlagSource::Threshold),
            "endpoint" | "model" => Ok(FlagSource::Endpoint),
            other => Err(ThresholdError::UnknownFlagSource(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ThresholdError {
    #[error("threshold must be a finite number, got {0}")]
    NotFinite(f64),
    #[error("threshold must not be negative, got {0}")]
    Negative(f64),
    #[error("unknown flag source '{0}' (expected 'threshold' or 'endpoint')")]
    UnknownFlagSource(String),
}

/// Check a candidate threshold
pub fn check_threshold(value: f64) -> Result<f64, ThresholdError> {
    if !value.is_finite() {
        return Err(ThresholdError::NotFinite(value));
    }
    if value < 0.0 {
        return Err(ThresholdError::Negative(value));
    }
    Ok(value)
}

/// Classification Settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationSettings {
    /// Cutoff on reconstruction error
    pub threshold: f64,

    /// Authority for the stored anomaly flag
    pub flag_source: FlagSource,

    /// Send webhook alerts for anomalies
    pub alerts_enabled: bool,

    /// Mark rows above the current threshold in listings
    pub highlight_anomalies: bool,
}

impl Default for ClassificationSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            flag_source: FlagSource::default(),
            alerts_enabled: true,
            highlight_anomalies: true,
        }
    }
}

impl ClassificationSettings {
    pub fn new(threshold: f64, flag_source: FlagSource) -> Result<Self, ThresholdError> {
        Ok(Self {
            threshold: check_threshold(threshold)?,
            flag_source,
            ..Default::default()
        })
    }

    /// Replace the cutoff used by later classifications
    pub fn set_threshold(&mut self, value: f64) -> Result<(), ThresholdError> {
        self.threshold = check_threshold(value)?;
        Ok(())
    }

    /// Decide the stored flag
    ///
    /// Returns `None` when the flag source is the endpoint and the endpoint
    /// did not report a flag.
    pub fn classify(&self, reconstruction_error: f64, endpoint_flag: Option<bool>) -> Option<bool> {
        match self.flag_source {
            FlagSource::Threshold => Some(reconstruction_error >= self.threshold),
            FlagSource::Endpoint => endpoint_flag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_thresholds() {
        let mut settings = ClassificationSettings::default();

        assert!(matches!(settings.set_threshold(f64::NAN), Err(ThresholdError::NotFinite(_))));
        assert!(matches!(
            settings.set_threshold(f64::INFINITY),
            Err(ThresholdError::NotFinite(_))
        ));
        assert_eq!(settings.set_threshold(-0.2), Err(ThresholdError::Negative(-0.2)));
        assert_eq!(settings.threshold, DEFAULT_THRESHOLD);

        settings.set_threshold(0.0).unwrap();
        assert_eq!(settings.threshold, 0.0);
    }

    #[test]
    fn test_threshold_classification_is_inclusive() {
        let settings = ClassificationSettings::new(0.5, FlagSource::Threshold).unwrap();

        assert_eq!(settings.classify(0.5, Some(false)), Some(true));
        assert_eq!(settings.classify(0.49, Some(true)), Some(false));
        assert_eq!(settings.classify(0.7, None), Some(true));
    }

    #[test]
    fn test_endpoint_classification_uses_endpoint_flag() {
        let settings = ClassificationSettings::new(0.5, FlagSource::Endpoint).unwrap();

        assert_eq!(settings.classify(0.9, Some(false)), Some(false));
        assert_eq!(settings.classify(0.1, Some(true)), Some(true));
        assert_eq!(settings.classify(0.9, None), None);
    }

    #[test]
    fn test_flag_source_parsing() {
        assert_eq!("Threshold".parse::<FlagSource>().unwrap(), FlagSource::Threshold);
        assert_eq!("endpoint".parse::<FlagSource>().unwrap(), FlagSource::Endpoint);
        assert!("majority".parse::<FlagSource>().is_err());
    }
}
