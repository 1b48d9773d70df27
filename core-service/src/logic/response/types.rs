//! Alert Types

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_WEBHOOK_TIMEOUT_SECS, UNKNOWN_ADDRESS};
use crate::logic::model::{PredictionRecord, RiskLevel};

// ============================================================================
// WEBHOOK TYPES
// ============================================================================

/// Webhook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    pub platform: WebhookPlatform,
    pub timeout_secs: u64,
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>, platform: WebhookPlatform) -> Self {
        Self {
            url: url.into(),
            platform,
            timeout_secs: DEFAULT_WEBHOOK_TIMEOUT_SECS,
        }
    }
}

/// Webhook platform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookPlatform {
    #[default]
    Discord,
    Slack,
    Generic,
}

impl WebhookPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookPlatform::Discord => "discord",
            WebhookPlatform::Slack => "slack",
            WebhookPlatform::Generic => "generic",
        }
    }
}

impl FromStr for WebhookPlatform {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "discord" => Ok(WebhookPlatform::Discord),
            "slack" => Ok(WebhookPlatform::Slack),
            "generic" | "json" => Ok(WebhookPlatform::Generic),
            other => Err(AlertError::UnknownPlatform(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AlertError {
    #[error("webhook network error: {0}")]
    Network(String),
    #[error("webhook timed out")]
    Timeout,
    #[error("webhook returned HTTP {0}")]
    Status(u16),
    #[error("unknown webhook platform '{0}'")]
    UnknownPlatform(String),
}

impl From<reqwest::Error> for AlertError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AlertError::Timeout
        } else {
            AlertError::Network(e.to_string())
        }
    }
}

// ============================================================================
// PAYLOAD
// ============================================================================

/// Alert severity for webhooks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertSeverity {
    Info = 0,
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "Info",
            AlertSeverity::Low => "Low",
            AlertSeverity::Medium => "Medium",
            AlertSeverity::High => "High",
            AlertSeverity::Critical => "Critical",
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "[INFO]",
            AlertSeverity::Low => "[LOW]",
            AlertSeverity::Medium => "[MEDIUM]",
            AlertSeverity::High => "[HIGH]",
            AlertSeverity::Critical => "[CRITICAL]",
        }
    }
}

impl From<RiskLevel> for AlertSeverity {
    fn from(level: RiskLevel) -> Self {
        match level {
            RiskLevel::Low => AlertSeverity::Low,
            RiskLevel::Medium => AlertSeverity::Medium,
            RiskLevel::High => AlertSeverity::High,
            RiskLevel::Critical => AlertSeverity::Critical,
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Labelled line in an alert body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertField {
    pub name: String,
    pub value: String,
}

/// Alert payload to send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPayload {
    pub title: String,
    pub message: String,
    pub severity: AlertSeverity,
    pub timestamp: DateTime<Utc>,
    pub hostname: Option<String>,
    pub record_id: Option<String>,
    pub fields: Vec<AlertField>,
}

impl AlertPayload {
    pub fn new(title: &str, message: &str, severity: AlertSeverity) -> Self {
        Self {
            title: title.to_string(),
            message: message.to_string(),
            severity,
            timestamp: Utc::now(),
            hostname: hostname::get().ok().map(|h| h.to_string_lossy().to_string()),
            record_id: None,
            fields: Vec::new(),
        }
    }

    /// Alert describing an anomalous record
    pub fn for_record(record: &PredictionRecord) -> Self {
        let features = record
            .features
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(", ");

        let mut payload = Self::new(
            &format!("{} Anomaly Detected", record.variant.label()),
            &format!(
                "Reconstruction error {:.6} (threshold {})",
                record.reconstruction_error, record.threshold_at_ingestion
            ),
            record.risk_level().into(),
        );
        payload.record_id = Some(record.id.to_string());
        payload
            .with_field("Timestamp", record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string())
            .with_field("Features", features)
            .with_field("Reconstruction Error", format!("{:.6}", record.reconstruction_error))
            .with_field("Source IP", record.source_ip().unwrap_or(UNKNOWN_ADDRESS))
            .with_field("Destination IP", record.dest_ip().unwrap_or(UNKNOWN_ADDRESS))
    }

    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.push(AlertField {
            name: name.to_string(),
            value: value.into(),
        });
        self
    }

    /// Plain-text rendering used by chat platforms
    pub fn to_text(&self) -> String {
        let mut text = format!("{} **{}**\n{}", self.severity.tag(), self.title, self.message);
        for field in &self.fields {
            text.push_str(&format!("\n**{}:** {}", field.name, field.value));
        }
        if let Some(ref hostname) = self.hostname {
            text.push_str(&format!("\n**Host:** {}", hostname));
        }
        text
    }
}
