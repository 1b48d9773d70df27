//! Time-series client - InfluxDB v2 query API
//!
//! Sends Flux over HTTP and reads the CSV answer. Result sets with several
//! schemas come back as blocks separated by blank lines, each with its own
//! header row; annotation rows start with `#`.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Number, Value};

use super::flux::{FluxError, FluxQuery};
use crate::constants::{DEFAULT_LIVE_LIMIT, DEFAULT_LIVE_WINDOW, DEFAULT_TIMESERIES_TIMEOUT_SECS};
use crate::logic::features::{Provenance, RawSample, Variant};

/// Columns produced by the query engine that are not part of a row's data
const META_COLUMNS: &[&str] = &["", "result", "table", "_start", "_stop", "_time", "_measurement"];

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Clone)]
pub struct TimeSeriesConfig {
    pub url: String,
    pub org: String,
    pub token: String,
    pub bucket: String,
    pub measurement: String,
    /// Fields read from the measurement, the feature contract by default
    pub fields: Vec<String>,
    /// Relative window of the live query, e.g. `-1m`
    pub live_window: String,
    pub live_limit: usize,
    pub timeout_secs: u64,
}

impl TimeSeriesConfig {
    pub fn new(url: &str, org: &str, token: &str, bucket: &str, variant: Variant) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            org: org.to_string(),
            token: token.to_string(),
            bucket: bucket.to_string(),
            measurement: variant.default_measurement().to_string(),
            fields: variant.required_features().iter().map(|f| f.to_string()).collect(),
            live_window: DEFAULT_LIVE_WINDOW.to_string(),
            live_limit: DEFAULT_LIVE_LIMIT,
            timeout_secs: DEFAULT_TIMESERIES_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for TimeSeriesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeSeriesConfig")
            .field("url", &self.url)
            .field("org", &self.org)
            .field("token", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("measurement", &self.measurement)
            .field("fields", &self.fields)
            .field("live_window", &self.live_window)
            .field("live_limit", &self.live_limit)
            .finish()
    }
}

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// One pivoted row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesRow {
    pub time: Option<DateTime<Utc>>,
    pub values: Map<String, Value>,
}

impl TimeSeriesRow {
    /// Split tags into provenance and keep the rest as sample fields
    pub fn into_sample(mut self) -> RawSample {
        let mut take = |key: &str| match self.values.remove(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        };
        let provenance = Provenance {
            source_ip: take("source_ip"),
            dest_ip: take("dest_ip"),
            protocol: take("protocol"),
        };

        RawSample::live(self.values, self.time, Some(provenance))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceError {
    #[error(transparent)]
    Query(#[from] FluxError),
    #[error("time-series network error: {0}")]
    Network(String),
    #[error("time-series query timed out")]
    Timeout,
    #[error("time-series query failed with HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unreadable time-series response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout
        } else {
            SourceError::Network(e.to_string())
        }
    }
}

impl From<csv::Error> for SourceError {
    fn from(e: csv::Error) -> Self {
        SourceError::Parse(e.to_string())
    }
}

/// Where live samples come from
pub trait SampleSource: Send + Sync {
    /// Samples from the live window newer than `after`, oldest first
    fn poll_latest(
        &self,
        after: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<Vec<RawSample>, SourceError>> + Send;
}

// ============================================================================
// CLIENT
// ============================================================================

pub struct TimeSeriesClient {
    config: TimeSeriesConfig,
    http_client: reqwest::Client,
}

impl TimeSeriesClient {
    pub fn new(config: TimeSeriesConfig) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self { config, http_client })
    }

    pub fn config(&self) -> &TimeSeriesConfig {
        &self.config
    }

    /// Query the live window for the configured fields
    pub fn live_query(&self, after: Option<DateTime<Utc>>) -> Result<FluxQuery, FluxError> {
        let query = FluxQuery::new(&self.config.bucket, &self.config.measurement)?
            .last(&self.config.live_window)?
            .fields(&self.config.fields)?
            .limit(self.config.live_limit);

        Ok(match after {
            Some(t) => query.after(t),
            None => query,
        })
    }

    /// Raw rows between two instants, oldest first
    pub async fn fetch_range(
        &self,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    ) -> Result<Vec<TimeSeriesRow>, SourceError> {
        let query = FluxQuery::new(&self.config.bucket, &self.config.measurement)?
            .between(start, stop)?
            .fields(&self.config.fields)?;

        self.query(&query.render()).await
    }

    /// Run a Flux query
    pub async fn query(&self, flux: &str) -> Result<Vec<TimeSeriesRow>, SourceError> {
        let url = format!("{}/api/v2/query", self.config.url);

        let response = self
            .http_client
            .post(&url)
            .query(&[("org", self.config.org.as_str())])
            .header("Authorization", format!("Token {}", self.config.token))
            .header("Content-Type", "application/vnd.flux")
            .header("Accept", "application/csv")
            .body(flux.to_string())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        parse_csv(&body)
    }
}

impl SampleSource for TimeSeriesClient {
    async fn poll_latest(&self, after: Option<DateTime<Utc>>) -> Result<Vec<RawSample>, SourceError> {
        let query = self.live_query(after)?;
        let rows = self.query(&query.render()).await?;
        log::debug!("Polled {} rows from {}", rows.len(), self.config.measurement);

        Ok(rows.into_iter().map(TimeSeriesRow::into_sample).collect())
    }
}

// ============================================================================
// CSV PARSING
// ============================================================================

/// Parse an InfluxDB CSV response into rows
pub fn parse_csv(body: &str) -> Result<Vec<TimeSeriesRow>, SourceError> {
    let normalized = body.replace("\r\n", "\n");
    let mut rows = Vec::new();

    for block in normalized.split("\n\n").filter(|b| !b.trim().is_empty()) {
        let mut reader = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .flexible(true)
            .has_headers(true)
            .from_reader(block.as_bytes());

        let headers = reader.headers()?.clone();
        if headers.iter().any(|h| h == "error") {
            let message = reader
                .records()
                .next()
                .transpose()?
                .and_then(|r| headers.iter().position(|h| h == "error").and_then(|i| r.get(i).map(str::to_string)))
                .unwrap_or_default();
            return Err(SourceError::Parse(message));
        }

        for record in reader.records() {
            let record = record?;
            let mut time = None;
            let mut values = Map::new();

            for (name, raw) in headers.iter().zip(record.iter()) {
                if name == "_time" {
                    time = DateTime::parse_from_rfc3339(raw).ok().map(|t| t.with_timezone(&Utc));
                    continue;
                }
                if META_COLUMNS.contains(&name) || raw.is_empty() {
                    continue;
                }
                values.insert(name.to_string(), parse_value(raw));
            }

            rows.push(TimeSeriesRow { time, values });
        }
    }

    Ok(rows)
}

fn parse_value(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Number(i.into());
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().chars().take(200).collect())
}

// ============================================================================
// TESTS
// ============================================================================
