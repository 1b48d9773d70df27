//! Analysis Loop - periodic live polling
//!
//! Each tick polls the time-series source once and pushes the returned
//! samples through the pipeline in order. Failures are per sample; nothing
//! is queued or retried for the next tick.
//!
//! Live windows overlap between ticks, so the loop keeps the newest source
//! time it has seen and only ingests rows strictly after it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::{self, MissedTickBehavior};

use crate::logic::features::RawSample;
use crate::logic::journal::AnomalyJournal;
use crate::logic::model::InferenceBackend;
use crate::logic::response::AlertSink;
use crate::logic::session::{IngestError, Pipeline, Session};
use crate::logic::timeseries::SampleSource;

/// Outcome of one poll
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickReport {
    pub polled: usize,
    /// Rows already handled by an earlier tick
    pub already_seen: usize,
    pub ingested: usize,
    pub anomalies: usize,
    pub rejected: usize,
    pub upstream_failures: usize,
    pub warnings: usize,
    pub source_error: Option<String>,
}

/// Newest source time handed to the pipeline so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveCursor {
    last_seen: Option<DateTime<Utc>>,
}

impl LiveCursor {
    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.last_seen
    }

    /// Rows without a source time cannot be matched and always count as new
    fn is_new(&self, sample: &RawSample) -> bool {
        match (self.last_seen, sample.observed_at) {
            (Some(last), Some(at)) => at > last,
            _ => true,
        }
    }

    fn advance(&mut self, at: Option<DateTime<Utc>>) {
        if at > self.last_seen {
            self.last_seen = at;
        }
    }
}

/// Poll once and ingest every row newer than the cursor
///
/// The cursor moves past every new row, including ones that were rejected
/// or dropped on an upstream failure.
pub async fn run_tick<I, J, A, S>(
    pipeline: &Pipeline<I, J, A>,
    session: &Session,
    source: &S,
    cursor: &mut LiveCursor,
) -> TickReport
where
    I: InferenceBackend,
    J: AnomalyJournal,
    A: AlertSink,
    S: SampleSource,
{
    let mut report = TickReport::default();

    let samples = match source.poll_latest(cursor.last_seen()).await {
        Ok(samples) => samples,
        Err(e) => {
            log::warn!("Live poll failed: {}", e);
            report.source_error = Some(e.to_string());
            return report;
        }
    };
    report.polled = samples.len();

    let (fresh, seen): (Vec<_>, Vec<_>) = samples.into_iter().partition(|s| cursor.is_new(s));
    report.already_seen = seen.len();

    for sample in fresh {
        cursor.advance(sample.observed_at);
        match pipeline.ingest(session, sample).await {
            Ok(ingested) => {
                report.ingested += 1;
                report.warnings += ingested.warnings.len();
                if ingested.record.is_anomaly {
                    report.anomalies += 1;
                }
            }
            Err(IngestError::UpstreamUnavailable(_)) => report.upstream_failures += 1,
            Err(e) => {
                log::debug!("Skipping live sample: {}", e);
                report.rejected += 1;
            }
        }
    }

    if report.polled > report.already_seen {
        log::info!(
            "Tick: {} polled ({} already seen), {} ingested, {} anomalies, {} rejected, {} upstream failures",
            report.polled,
            report.already_seen,
            report.ingested,
            report.anomalies,
            report.rejected,
            report.upstream_failures
        );
    }

    report
}

/// Poll forever at a fixed period
///
/// A tick that overruns the period delays the next one instead of causing a
/// burst of catch-up ticks.
pub async fn run<I, J, A, S>(pipeline: &Pipeline<I, J, A>, session: &Session, source: &S, period: Duration)
where
    I: InferenceBackend,
    J: AnomalyJournal,
    A: AlertSink,
    S: SampleSource,
{
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut cursor = LiveCursor::default();

    log::info!(
        "Live polling started ({} variant, every {}s)",
        pipeline.variant(),
        period.as_secs()
    );

    loop {
        interval.tick().await;
        run_tick(pipeline, session, source, &mut cursor).await;
    }
}
