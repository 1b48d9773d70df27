//! In-memory doubles for the outbound services

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::logic::features::{FeatureSet, RawSample};
use crate::logic::journal::{AnomalyJournal, JournalEntry, JournalError};
use crate::logic::model::{InferenceBackend, InferenceError, Prediction, UpstreamHealth};
use crate::logic::response::{AlertError, AlertPayload, AlertSink};
use crate::logic::timeseries::{SampleSource, SourceError};

/// Scores every sample with `error`, or replays queued answers first
pub struct MockInference {
    error: f64,
    flag: Option<bool>,
    queued: Mutex<VecDeque<Result<Prediction, InferenceError>>>,
    pub calls: AtomicUsize,
}

impl MockInference {
    pub fn scoring(error: f64, flag: Option<bool>) -> Self {
        Self {
            error,
            flag,
            queued: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn then(self, answer: Result<Prediction, InferenceError>) -> Self {
        self.queued.lock().push_back(answer);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(&self) -> Result<Prediction, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queued.lock().pop_front().unwrap_or(Ok(Prediction {
            reconstruction_error: self.error,
            anomaly: self.flag,
        }))
    }
}

impl InferenceBackend for MockInference {
    async fn predict(&self, _features: &FeatureSet) -> Result<Prediction, InferenceError> {
        self.next()
    }

    async fn predict_batch(&self, batch: &[FeatureSet]) -> Result<Vec<Prediction>, InferenceError> {
        batch.iter().map(|_| self.next()).collect()
    }

    async fn health(&self) -> Result<UpstreamHealth, InferenceError> {
        Ok(UpstreamHealth {
            status: "ok".to_string(),
            models_loaded: Some(true),
        })
    }
}

#[derive(Default)]
pub struct MockJournal {
    pub entries: Mutex<Vec<JournalEntry>>,
    pub attempts: AtomicUsize,
    pub fail: bool,
}

impl MockJournal {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl AnomalyJournal for MockJournal {
    async fn append(&self, entry: &JournalEntry) -> Result<(), JournalError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(JournalError::Unavailable("connection refused".to_string()));
        }
        self.entries.lock().push(entry.clone());
        Ok(())
    }

    async fn since(&self, cutoff: DateTime<Utc>) -> Result<Vec<JournalEntry>, JournalError> {
        let mut rows: Vec<_> = self
            .entries
            .lock()
            .iter()
            .filter(|e| e.timestamp >= cutoff)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(rows)
    }
}

#[derive(Default)]
pub struct MockSink {
    pub sent: Mutex<Vec<AlertPayload>>,
    pub attempts: AtomicUsize,
    pub fail: bool,
}

impl MockSink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl AlertSink for MockSink {
    async fn send(&self, payload: &AlertPayload) -> Result<(), AlertError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AlertError::Status(500));
        }
        self.sent.lock().push(payload.clone());
        Ok(())
    }
}

/// Hands out one queued poll result per call, then empty polls
///
/// Ignores `after` like a source whose window overlaps the previous poll.
#[derive(Default)]
pub struct MockSource {
    polls: Mutex<VecDeque<Result<Vec<RawSample>, SourceError>>>,
    pub requested_after: Mutex<Vec<Option<DateTime<Utc>>>>,
}

impl MockSource {
    pub fn then(self, poll: Result<Vec<RawSample>, SourceError>) -> Self {
        self.polls.lock().push_back(poll);
        self
    }
}

impl SampleSource for MockSource {
    async fn poll_latest(&self, after: Option<DateTime<Utc>>) -> Result<Vec<RawSample>, SourceError> {
        self.requested_after.lock().push(after);
        self.polls.lock().pop_front().unwrap_or(Ok(Vec::new()))
    }
}
