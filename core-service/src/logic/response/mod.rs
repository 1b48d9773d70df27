//! Response Module - anomaly alerting
//!
//! # Components
//! - `types.rs`: Payload, severity and webhook configuration
//! - `webhook.rs`: Alert sink trait and the HTTP webhook notifier

pub mod types;
pub mod webhook;

pub use types::{AlertError, AlertField, AlertPayload, AlertSeverity, WebhookConfig, WebhookPlatform};
pub use webhook::{AlertSink, DeliveryAttempt, WebhookNotifier, WebhookStats};
