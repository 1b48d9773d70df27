//! Flux query builder
//!
//! Every name interpolated into a query is checked against a conservative
//! identifier pattern first; anything else is rejected rather than escaped.

use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\- ]+$").expect("identifier pattern is valid"));

static RELATIVE_WINDOW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-[1-9][0-9]*(s|m|h|d|w)$").expect("window pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FluxError {
    #[error("invalid {kind} name '{value}'")]
    InvalidIdentifier { kind: &'static str, value: String },
    #[error("invalid relative window '{0}'")]
    InvalidWindow(String),
    #[error("range start must be before stop")]
    EmptyRange,
}

/// Check a bucket, measurement or field name
pub fn check_identifier(kind: &'static str, value: &str) -> Result<(), FluxError> {
    if IDENTIFIER.is_match(value) {
        Ok(())
    } else {
        Err(FluxError::InvalidIdentifier {
            kind,
            value: value.to_string(),
        })
    }
}

/// Normalize a relative window to Flux form (`-1m`, `-24h`)
pub fn relative_window(window: &str) -> Result<String, FluxError> {
    let trimmed = window.trim();
    let normalized = if trimmed.starts_with('-') {
        trimmed.to_string()
    } else {
        format!("-{}", trimmed)
    };

    if RELATIVE_WINDOW.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(FluxError::InvalidWindow(window.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimeSpan {
    /// `range(start: -1m)`
    Relative(String),
    /// `range(start: ..., stop: ...)`
    Absolute {
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FluxQuery {
    bucket: String,
    measurement: String,
    span: TimeSpan,
    after: Option<DateTime<Utc>>,
    fields: Vec<String>,
    pivot: bool,
    descending: bool,
    limit: Option<usize>,
}

impl FluxQuery {
    pub fn new(bucket: &str, measurement: &str) -> Result<Self, FluxError> {
        check_identifier("bucket", bucket)?;
        check_identifier("measurement", measurement)?;

        Ok(Self {
            bucket: bucket.to_string(),
            measurement: measurement.to_string(),
            span: TimeSpan::Relative("-1m".to_string()),
            after: None,
            fields: Vec::new(),
            pivot: true,
            descending: false,
            limit: None,
        })
    }

    pub fn last(mut self, window: &str) -> Result<Self, FluxError> {
        self.span = TimeSpan::Relative(relative_window(window)?);
        Ok(self)
    }

    pub fn between(mut self, start: DateTime<Utc>, stop: DateTime<Utc>) -> Result<Self, FluxError> {
        if start >= stop {
            return Err(FluxError::EmptyRange);
        }
        self.span = TimeSpan::Absolute { start, stop };
        Ok(self)
    }

    /// Only rows strictly newer than `t`
    pub fn after(mut self, t: DateTime<Utc>) -> Self {
        self.after = Some(t);
        self
    }

    /// Restrict to the given fields
    pub fn fields<S: AsRef<str>>(mut self, fields: &[S]) -> Result<Self, FluxError> {
        let mut checked = Vec::with_capacity(fields.len());
        for field in fields {
            check_identifier("field", field.as_ref())?;
            checked.push(field.as_ref().to_string());
        }
        self.fields = checked;
        Ok(self)
    }

    pub fn descending(mut self, descending: bool) -> Self {
        self.descending = descending;
        self
    }

    /// Keep the newest `n` rows
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn render(&self) -> String {
        let mut q = format!("from(bucket: \"{}\")\n", self.bucket);

        match &self.span {
            TimeSpan::Relative(window) => {
                let _ = writeln!(q, "  |> range(start: {})", window);
            }
            TimeSpan::Absolute { start, stop } => {
                let _ = writeln!(
                    q,
                    "  |> range(start: {}, stop: {})",
                    start.to_rfc3339_opts(SecondsFormat::Secs, true),
                    stop.to_rfc3339_opts(SecondsFormat::Secs, true)
                );
            }
        }

        let _ = writeln!(q, "  |> filter(fn: (r) => r._measurement == \"{}\")", self.measurement);

        if let Some(after) = self.after {
            let _ = writeln!(
                q,
                "  |> filter(fn: (r) => r._time > {})",
                after.to_rfc3339_opts(SecondsFormat::AutoSi, true)
            );
        }

        if !self.fields.is_empty() {
            let predicate = self
                .fields
                .iter()
                .map(|f| format!("r._field == \"{}\"", f))
                .collect::<Vec<_>>()
                .join(" or ");
            let _ = writeln!(q, "  |> filter(fn: (r) => {})", predicate);
        }

        if self.pivot {
            q.push_str("  |> pivot(rowKey: [\"_time\"], columnKey: [\"_field\"], valueColumn: \"_value\")\n");
        }

        // Merge per-tag tables so ordering and limit apply to the whole result
        q.push_str("  |> group()\n");
        let _ = writeln!(q, "  |> sort(columns: [\"_time\"], desc: {})", self.descending);

        if let Some(n) = self.limit {
            let keep = if self.descending { "limit" } else { "tail" };
            let _ = writeln!(q, "  |> {}(n: {})", keep, n);
        }

        q
    }
}
