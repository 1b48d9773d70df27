//! Ingest pipeline
//!
//! validate -> score -> classify -> append -> (log, alert)
//!
//! A sample either lands in the buffer or is dropped with an error. Once it
//! lands, failures of the durable log or the webhook are reported as
//! warnings and never undo the append.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::Session;
use crate::logic::features::{validate, FeatureSet, RawSample, SampleError, Variant};
use crate::logic::journal::{AnomalyJournal, JournalEntry};
use crate::logic::model::{FlagSource, InferenceBackend, InferenceError, Prediction, PredictionRecord};
use crate::logic::response::{AlertPayload, AlertSink};

// ============================================================================
// RESULTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IngestError {
    #[error("invalid sample: {0}")]
    InvalidSample(#[from] SampleError),
    #[error("invalid sample at index {index}: {error}")]
    InvalidBatchSample { index: usize, error: SampleError },
    #[error("inference upstream unavailable: {0}")]
    UpstreamUnavailable(#[from] InferenceError),
}

/// Side effect that failed after the record was stored
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum SyncWarning {
    LogWriteFailed(String),
    AlertSendFailed(String),
}

/// A stored record and whatever went wrong forwarding it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ingested {
    pub record: PredictionRecord,
    pub warnings: Vec<SyncWarning>,
    /// Records pushed out of the buffer by this append
    pub evicted: usize,
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct Pipeline<I, J, A> {
    variant: Variant,
    required: Vec<String>,
    inference: I,
    journal: J,
    alerts: Option<A>,
}

impl<I, J, A> Pipeline<I, J, A>
where
    I: InferenceBackend,
    J: AnomalyJournal,
    A: AlertSink,
{
    /// `alerts` is `None` when no webhook is configured
    pub fn new(variant: Variant, inference: I, journal: J, alerts: Option<A>) -> Self {
        Self {
            variant,
            required: variant.required_features().iter().map(|f| f.to_string()).collect(),
            inference,
            journal,
            alerts,
        }
    }

    /// Replace the variant's feature contract for deployments with another schema
    pub fn with_required_features(mut self, features: Vec<String>) -> Self {
        self.required = features;
        self
    }

    pub fn required_features(&self) -> &[String] {
        &self.required
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn inference(&self) -> &I {
        &self.inference
    }

    pub fn journal(&self) -> &J {
        &self.journal
    }

    pub fn alerts(&self) -> Option<&A> {
        self.alerts.as_ref()
    }

    /// Score and store one sample
    pub async fn ingest(&self, session: &Session, raw: RawSample) -> Result<Ingested, IngestError> {
        let features = validate(&raw, &self.required)?;

        let prediction = self.inference.predict(&features).await.map_err(|e| {
            log::warn!("Inference failed, dropping {} sample: {}", self.variant.label(), e);
            e
        })?;

        self.commit(session, raw, features, prediction).await
    }

    /// Score several samples with one upstream call
    ///
    /// All samples are validated before anything is sent; results keep the
    /// request order.
    pub async fn ingest_batch(
        &self,
        session: &Session,
        samples: Vec<RawSample>,
    ) -> Result<Vec<Ingested>, IngestError> {
        if samples.is_empty() {
            return Ok(Vec::new());
        }

        let required = &self.required;
        let features = samples
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                validate(raw, required).map_err(|error| IngestError::InvalidBatchSample { index, error })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let predictions = self.inference.predict_batch(&features).await.map_err(|e| {
            log::warn!("Batch inference failed, dropping {} samples: {}", samples.len(), e);
            e
        })?;

        if session.settings().flag_source == FlagSource::Endpoint
            && predictions.iter().any(|p| p.anomaly.is_none())
        {
            return Err(missing_flag());
        }

        let mut results = Vec::with_capacity(samples.len());
        for ((raw, features), prediction) in samples.into_iter().zip(features).zip(predictions) {
            results.push(self.commit(session, raw, features, prediction).await?);
        }

        Ok(results)
    }

    async fn commit(
        &self,
        session: &Session,
        raw: RawSample,
        features: FeatureSet,
        prediction: Prediction,
    ) -> Result<Ingested, IngestError> {
        let settings = session.settings();
        let is_anomaly = settings
            .classify(prediction.reconstruction_error, prediction.anomaly)
            .ok_or_else(missing_flag)?;

        if let Some(flag) = prediction.anomaly {
            if flag != is_anomaly {
                log::debug!(
                    "Endpoint flag {} disagrees with {} classification (error {:.6}, threshold {})",
                    flag,
                    settings.flag_source,
                    prediction.reconstruction_error,
                    settings.threshold
                );
            }
        }

        let record = PredictionRecord {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            observed_at: raw.observed_at,
            variant: self.variant,
            origin: raw.origin,
            features,
            reconstruction_error: prediction.reconstruction_error,
            is_anomaly,
            threshold_at_ingestion: settings.threshold,
            endpoint_flag: prediction.anomaly,
            provenance: raw.provenance,
        };

        let evicted = session.append(record.clone()).len();

        let warnings = if is_anomaly {
            log::info!(
                "{} anomaly detected: error {:.6} (threshold {})",
                self.variant.label(),
                record.reconstruction_error,
                record.threshold_at_ingestion
            );
            self.forward(&record, settings.alerts_enabled).await
        } else {
            Vec::new()
        };

        Ok(Ingested {
            record,
            warnings,
            evicted,
        })
    }

    /// One durable log write and at most one alert, concurrently
    async fn forward(&self, record: &PredictionRecord, alerts_enabled: bool) -> Vec<SyncWarning> {
        let entry = JournalEntry::from(record);
        let payload = AlertPayload::for_record(record);

        let alert = async {
            match &self.alerts {
                Some(sink) if alerts_enabled => Some(sink.send(&payload).await),
                _ => None,
            }
        };
        let (logged, alerted) = tokio::join!(self.journal.append(&entry), alert);

        let mut warnings = Vec::new();
        if let Err(e) = logged {
            log::warn!("Durable log write failed for {}: {}", record.id, e);
            warnings.push(SyncWarning::LogWriteFailed(e.to_string()));
        }
        if let Some(Err(e)) = alerted {
            log::warn!("Alert delivery failed for {}: {}", record.id, e);
            warnings.push(SyncWarning::AlertSendFailed(e.to_string()));
        }
        warnings
    }
}

fn missing_flag() -> IngestError {
    IngestError::UpstreamUnavailable(InferenceError::Malformed(
        "response has no anomaly flag".to_string(),
    ))
}
