//! Configuration module
//!
//! Read once at startup. Every key except `SENTINEL_VARIANT` is looked up
//! with the variant prefix first (`DOS_INFERENCE_URL`, then `INFERENCE_URL`),
//! so one environment file can serve both deployments.

use std::env;
use std::fmt;
use std::str::FromStr;

use sentinel_core::constants::{
    DEFAULT_BUFFER_CAPACITY, DEFAULT_INFERENCE_TIMEOUT_SECS, DEFAULT_LIVE_LIMIT,
    DEFAULT_LIVE_WINDOW, DEFAULT_PAGE_SIZE, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_THRESHOLD,
    DEFAULT_WEBHOOK_TIMEOUT_SECS, MAX_INFERENCE_TIMEOUT_SECS, MAX_PAGE_SIZE,
    MAX_POLL_INTERVAL_SECS, MIN_INFERENCE_TIMEOUT_SECS, MIN_POLL_INTERVAL_SECS,
};
use sentinel_core::logic::model::check_threshold;
use sentinel_core::logic::response::WebhookPlatform;
use sentinel_core::logic::timeseries::{check_identifier, relative_window};
use sentinel_core::{FlagSource, InferenceConfig, TimeSeriesConfig, Variant, WebhookConfig};

const INFLUX_KEYS: [&str; 4] = ["INFLUXDB_URL", "INFLUXDB_ORG", "INFLUXDB_TOKEN", "INFLUXDB_BUCKET"];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(String),
    #[error("{key}={value} is invalid: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
    #[error("time-series source is partially configured, missing {0}")]
    Incomplete(String),
}

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub variant: Variant,

    /// Server port
    pub port: u16,

    /// Durable log connection URL
    pub database_url: String,

    pub inference: InferenceConfig,

    /// Features sent to the inference endpoint and read from the time-series store
    pub required_features: Vec<String>,

    /// `None` disables alerts
    pub webhook: Option<WebhookConfig>,

    /// `None` disables live polling
    pub timeseries: Option<TimeSeriesConfig>,

    pub poll_interval_secs: u64,
    pub buffer_capacity: usize,
    pub page_size: usize,
    pub threshold: f64,
    pub flag_source: FlagSource,
    pub alerts_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Build from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let variant: Variant = match non_empty(lookup("SENTINEL_VARIANT")) {
            Some(v) => v.parse().map_err(|e: sentinel_core::logic::features::UnknownVariant| {
                ConfigError::Invalid {
                    key: "SENTINEL_VARIANT".to_string(),
                    value: v.clone(),
                    reason: e.to_string(),
                }
            })?,
            None => Variant::default(),
        };
        let vars = Vars { lookup, variant };

        let required_features: Vec<String> = match vars.get("REQUIRED_FEATURES") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect(),
            None => variant.required_features().iter().map(|f| f.to_string()).collect(),
        };

        let inference_url = vars
            .get("INFERENCE_URL")
            .ok_or_else(|| ConfigError::Missing(vars.key("INFERENCE_URL")))?;
        let mut inference = InferenceConfig::new(inference_url);
        inference.timeout_secs = vars.parsed("INFERENCE_TIMEOUT_SECS", DEFAULT_INFERENCE_TIMEOUT_SECS)?;

        let webhook = match vars.get("ALERT_WEBHOOK_URL").or_else(|| vars.get("DISCORD_WEBHOOK")) {
            Some(url) => {
                let mut webhook = WebhookConfig::new(url, vars.parsed("ALERT_PLATFORM", WebhookPlatform::Discord)?);
                webhook.timeout_secs = vars.parsed("WEBHOOK_TIMEOUT_SECS", DEFAULT_WEBHOOK_TIMEOUT_SECS)?;
                Some(webhook)
            }
            None => None,
        };

        Ok(Self {
            variant,
            port: vars.parsed("PORT", 8080)?,
            database_url: vars
                .get("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://sentinel.db?mode=rwc".to_string()),
            inference,
            webhook,
            timeseries: vars.timeseries(&required_features)?,
            required_features,
            poll_interval_secs: vars.parsed("POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?,
            buffer_capacity: vars.parsed("BUFFER_CAPACITY", DEFAULT_BUFFER_CAPACITY)?,
            page_size: vars.parsed("PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
            threshold: vars.parsed("ANOMALY_THRESHOLD", DEFAULT_THRESHOLD)?,
            flag_source: vars.parsed("FLAG_SOURCE", FlagSource::Threshold)?,
            alerts_enabled: vars.parsed("ALERTS_ENABLED", true)?,
        })
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, value: String, reason: &str| ConfigError::Invalid {
            key: key.to_string(),
            value,
            reason: reason.to_string(),
        };

        if !(MIN_POLL_INTERVAL_SECS..=MAX_POLL_INTERVAL_SECS).contains(&self.poll_interval_secs) {
            return Err(invalid(
                "POLL_INTERVAL_SECS",
                self.poll_interval_secs.to_string(),
                &format!("must be between {} and {}", MIN_POLL_INTERVAL_SECS, MAX_POLL_INTERVAL_SECS),
            ));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(invalid(
                "PAGE_SIZE",
                self.page_size.to_string(),
                &format!("must be between 1 and {}", MAX_PAGE_SIZE),
            ));
        }
        if self.buffer_capacity == 0 {
            return Err(invalid("BUFFER_CAPACITY", "0".to_string(), "must be at least 1"));
        }
        if !(MIN_INFERENCE_TIMEOUT_SECS..=MAX_INFERENCE_TIMEOUT_SECS).contains(&self.inference.timeout_secs) {
            return Err(invalid(
                "INFERENCE_TIMEOUT_SECS",
                self.inference.timeout_secs.to_string(),
                &format!(
                    "must be between {} and {}",
                    MIN_INFERENCE_TIMEOUT_SECS, MAX_INFERENCE_TIMEOUT_SECS
                ),
            ));
        }
        if self.required_features.is_empty() {
            return Err(invalid("REQUIRED_FEATURES", String::new(), "must name at least one feature"));
        }
        for feature in &self.required_features {
            check_identifier("field", feature)
                .map_err(|e| invalid("REQUIRED_FEATURES", feature.clone(), &e.to_string()))?;
        }
        check_threshold(self.threshold)
            .map_err(|e| invalid("ANOMALY_THRESHOLD", self.threshold.to_string(), &e.to_string()))?;
        if let Some(ref ts) = self.timeseries {
            relative_window(&ts.live_window)
                .map_err(|e| invalid("LIVE_WINDOW", ts.live_window.clone(), &e.to_string()))?;
        }

        Ok(())
    }

    /// Database URL with credentials stripped, for logs
    pub fn database_display(&self) -> &str {
        self.database_url.split('@').last().unwrap_or("***")
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("variant", &self.variant)
            .field("port", &self.port)
            .field("database", &self.database_display())
            .field("inference_url", &self.inference.predict_url)
            .field("required_features", &self.required_features)
            .field("alerts", &self.webhook.as_ref().map(|w| w.platform))
            .field("timeseries", &self.timeseries)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("buffer_capacity", &self.buffer_capacity)
            .field("page_size", &self.page_size)
            .field("threshold", &self.threshold)
            .field("flag_source", &self.flag_source)
            .finish()
    }
}

// ============================================================================
// LOOKUP HELPERS
// ============================================================================

struct Vars<F> {
    lookup: F,
    variant: Variant,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn key(&self, name: &str) -> String {
        format!("{}{}", self.variant.env_prefix(), name)
    }

    fn get(&self, name: &str) -> Option<String> {
        non_empty((self.lookup)(&self.key(name))).or_else(|| non_empty((self.lookup)(name)))
    }

    fn parsed<T>(&self, name: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.get(name) {
            Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                key: name.to_string(),
                value: value.clone(),
                reason: e.to_string(),
            }),
            None => Ok(default),
        }
    }

    fn timeseries(&self, fields: &[String]) -> Result<Option<TimeSeriesConfig>, ConfigError> {
        let values: Vec<Option<String>> = INFLUX_KEYS.iter().map(|k| self.get(k)).collect();

        match values.as_slice() {
            [Some(url), Some(org), Some(token), Some(bucket)] => {
                let mut ts = TimeSeriesConfig::new(url, org, token, bucket, self.variant);
                if let Some(measurement) = self.get("INFLUXDB_MEASUREMENT") {
                    ts.measurement = measurement;
                }
                ts.fields = fields.to_vec();
                ts.live_window = self
                    .get("LIVE_WINDOW")
                    .unwrap_or_else(|| DEFAULT_LIVE_WINDOW.to_string());
                ts.live_limit = self.parsed("LIVE_LIMIT", DEFAULT_LIVE_LIMIT)?;
                Ok(Some(ts))
            }
            _ if values.iter().all(Option::is_none) => Ok(None),
            _ => {
                let missing: Vec<&str> = INFLUX_KEYS
                    .iter()
                    .zip(&values)
                    .filter(|(_, v)| v.is_none())
                    .map(|(k, _)| *k)
                    .collect();
                Err(ConfigError::Incomplete(missing.join(", ")))
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ============================================================================
// TESTS
// ============================================================================
