//! Webhook Alert Module
//!
//! Posts anomaly alerts to a chat webhook (Discord, Slack) or any endpoint
//! that accepts the raw JSON payload. One attempt per alert; a 2xx status
//! is the only delivery confirmation we get.

use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use super::types::{AlertError, AlertPayload, AlertSeverity, WebhookConfig, WebhookPlatform};
use crate::constants::{ALERT_HISTORY_LIMIT, APP_NAME};

/// Discord rejects messages longer than this
const DISCORD_CONTENT_LIMIT: usize = 2000;

// ============================================================================
// SINK TRAIT
// ============================================================================

/// Anything alerts can be delivered to
pub trait AlertSink: Send + Sync {
    fn send(&self, payload: &AlertPayload) -> impl Future<Output = Result<(), AlertError>> + Send;
}

// ============================================================================
// NOTIFIER
// ============================================================================

/// One delivery attempt
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryAttempt {
    pub title: String,
    pub severity: AlertSeverity,
    pub success: bool,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookStats {
    pub platform: WebhookPlatform,
    pub alerts_sent: usize,
    pub alerts_failed: usize,
    pub last_error: Option<String>,
}

pub struct WebhookNotifier {
    config: WebhookConfig,
    http_client: reqwest::Client,
    history: Mutex<VecDeque<DeliveryAttempt>>,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig) -> Result<Self, AlertError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| AlertError::Network(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
            history: Mutex::new(VecDeque::with_capacity(ALERT_HISTORY_LIMIT)),
        })
    }

    pub fn platform(&self) -> WebhookPlatform {
        self.config.platform
    }

    /// Body posted for a payload on this platform
    pub fn format_payload(&self, payload: &AlertPayload) -> serde_json::Value {
        match self.config.platform {
            WebhookPlatform::Discord => {
                let content: String = payload.to_text().chars().take(DISCORD_CONTENT_LIMIT).collect();
                serde_json::json!({ "content": content })
            }
            WebhookPlatform::Slack => serde_json::json!({ "text": payload.to_text() }),
            WebhookPlatform::Generic => {
                serde_json::to_value(payload).unwrap_or_else(|_| serde_json::json!({}))
            }
        }
    }

    async fn deliver(&self, payload: &AlertPayload) -> Result<(), AlertError> {
        let body = self.format_payload(payload);
        let response = self.http_client.post(&self.config.url).json(&body).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AlertError::Status(response.status().as_u16()))
        }
    }

    fn record(&self, payload: &AlertPayload, result: &Result<(), AlertError>) {
        let mut history = self.history.lock();
        history.push_back(DeliveryAttempt {
            title: payload.title.clone(),
            severity: payload.severity,
            success: result.is_ok(),
            error: result.as_ref().err().map(|e| e.to_string()),
            timestamp: Utc::now(),
        });
        while history.len() > ALERT_HISTORY_LIMIT {
            history.pop_front();
        }
    }

    /// Send a fixed test alert
    pub async fn test(&self) -> Result<(), AlertError> {
        let payload = AlertPayload::new(
            &format!("[{}] Test Alert", APP_NAME),
            "This is a test alert. Your webhook is configured correctly!",
            AlertSeverity::Info,
        );
        self.send(&payload).await
    }

    /// Most recent attempts, oldest first
    pub fn history(&self) -> Vec<DeliveryAttempt> {
        self.history.lock().iter().cloned().collect()
    }

    pub fn stats(&self) -> WebhookStats {
        let history = self.history.lock();
        let (sent, failed) = history
            .iter()
            .fold((0, 0), |(s, f), e| if e.success { (s + 1, f) } else { (s, f + 1) });

        WebhookStats {
            platform: self.config.platform,
            alerts_sent: sent,
            alerts_failed: failed,
            last_error: history.iter().rev().find_map(|e| e.error.clone()),
        }
    }
}

impl AlertSink for WebhookNotifier {
    async fn send(&self, payload: &AlertPayload) -> Result<(), AlertError> {
        let result = self.deliver(payload).await;

        match &result {
            Ok(()) => log::info!("Alert sent via {} webhook: {}", self.config.platform.as_str(), payload.title),
            Err(e) => log::warn!("Failed to send alert via {} webhook: {}", self.config.platform.as_str(), e),
        }
        self.record(payload, &result);

        result
    }
}

// ============================================================================
// TESTS
// ============================================================================
