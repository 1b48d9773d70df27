//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Deployments override these through the dashboard's environment.

/// Maximum number of predictions kept in memory
pub const DEFAULT_BUFFER_CAPACITY: usize = 1000;

/// Rows per page in prediction listings
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Upper bound accepted for a deployment's page size
pub const MAX_PAGE_SIZE: usize = 1000;

/// Default anomaly threshold applied to reconstruction error
pub const DEFAULT_THRESHOLD: f64 = 0.1;

/// Live polling interval (seconds)
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Allowed polling interval range (seconds)
pub const MIN_POLL_INTERVAL_SECS: u64 = 3;
pub const MAX_POLL_INTERVAL_SECS: u64 = 60;

/// Inference endpoint timeout (seconds)
pub const DEFAULT_INFERENCE_TIMEOUT_SECS: u64 = 10;

/// Allowed inference timeout range (seconds)
pub const MIN_INFERENCE_TIMEOUT_SECS: u64 = 1;
pub const MAX_INFERENCE_TIMEOUT_SECS: u64 = 60;

/// Webhook delivery timeout (seconds)
pub const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 20;

/// Time-series query timeout (seconds)
pub const DEFAULT_TIMESERIES_TIMEOUT_SECS: u64 = 30;

/// Relative window used by the live time-series query
pub const DEFAULT_LIVE_WINDOW: &str = "-1m";

/// Maximum rows returned by one live poll
pub const DEFAULT_LIVE_LIMIT: usize = 100;

/// Delivery attempts remembered by the webhook notifier
pub const ALERT_HISTORY_LIMIT: usize = 100;

/// Longest history window accepted (days)
pub const MAX_HISTORY_WINDOW_DAYS: i64 = 365;

/// Number of source addresses reported in summaries
pub const TOP_SOURCES_LIMIT: usize = 5;

/// Placeholder stored for unknown network endpoints
pub const UNKNOWN_ADDRESS: &str = "N/A";

/// Format of timestamps written to the durable log (UTC)
pub const JOURNAL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "Traffic Sentinel";
