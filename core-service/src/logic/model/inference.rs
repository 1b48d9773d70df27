//! Inference Client - remote anomaly model over HTTP
//!
//! The model is opaque: we POST a flat feature object and get back a
//! reconstruction error and (usually) an anomaly flag. One attempt per call,
//! bounded by a fixed timeout. Retrying is the caller's business.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::constants::{
    DEFAULT_INFERENCE_TIMEOUT_SECS, MAX_INFERENCE_TIMEOUT_SECS, MIN_INFERENCE_TIMEOUT_SECS,
};
use crate::logic::features::FeatureSet;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Model output for one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(alias = "anomaly_score")]
    pub reconstruction_error: f64,

    /// Endpoint's own verdict; accepts `0/1` or booleans
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub anomaly: Option<bool>,
}

/// Upstream health report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamHealth {
    pub status: String,
    #[serde(default)]
    pub models_loaded: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("network error: {0}")]
    Network(String),
    #[error("inference endpoint timed out")]
    Timeout,
    #[error("inference endpoint returned HTTP {0}")]
    Status(u16),
    #[error("malformed inference response: {0}")]
    Malformed(String),
    #[error("batch response has {actual} predictions, expected {expected}")]
    BatchLength { expected: usize, actual: usize },
}

impl From<reqwest::Error> for InferenceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            InferenceError::Timeout
        } else if e.is_decode() {
            InferenceError::Malformed(e.to_string())
        } else {
            InferenceError::Network(e.to_string())
        }
    }
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(0) => Ok(Some(false)),
            Some(1) => Ok(Some(true)),
            _ => Err(D::Error::custom(format!("anomaly flag must be 0 or 1, got {}", n))),
        },
        Some(other) => Err(D::Error::custom(format!("unexpected anomaly flag {}", other))),
    }
}

/// Batch responses come either bare or wrapped
#[derive(Deserialize)]
#[serde(untagged)]
enum BatchResponse {
    Bare(Vec<Prediction>),
    Wrapped { predictions: Vec<Prediction> },
}

// ============================================================================
// BACKEND TRAIT
// ============================================================================

/// Anything that can score feature sets
pub trait InferenceBackend: Send + Sync {
    fn predict(
        &self,
        features: &FeatureSet,
    ) -> impl Future<Output = Result<Prediction, InferenceError>> + Send;

    /// Score several samples in one round trip, preserving order
    fn predict_batch(
        &self,
        batch: &[FeatureSet],
    ) -> impl Future<Output = Result<Vec<Prediction>, InferenceError>> + Send;

    fn health(&self) -> impl Future<Output = Result<UpstreamHealth, InferenceError>> + Send;
}

// ============================================================================
// HTTP CLIENT
// ============================================================================

/// Inference endpoint configuration
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Full URL of the single-sample endpoint, e.g. `https://host/predict`
    pub predict_url: String,
    pub timeout_secs: u64,
}

impl InferenceConfig {
    pub fn new(predict_url: impl Into<String>) -> Self {
        Self {
            predict_url: predict_url.into(),
            timeout_secs: DEFAULT_INFERENCE_TIMEOUT_SECS,
        }
    }

    /// Service root: the predict URL without its trailing `/predict`
    pub fn base_url(&self) -> &str {
        let url = self.predict_url.trim_end_matches('/');
        url.strip_suffix("/predict").unwrap_or(url)
    }

    pub fn batch_url(&self) -> String {
        format!("{}/predict_batch", self.base_url())
    }

    pub fn health_url(&self) -> String {
        format!("{}/health", self.base_url())
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(
            self.timeout_secs
                .clamp(MIN_INFERENCE_TIMEOUT_SECS, MAX_INFERENCE_TIMEOUT_SECS),
        )
    }
}

/// reqwest-backed inference client
#[derive(Debug, Clone)]
pub struct InferenceClient {
    config: InferenceConfig,
    http_client: reqwest::Client,
}

impl InferenceClient {
    pub fn new(config: InferenceConfig) -> Result<Self, InferenceError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| InferenceError::Network(e.to_string()))?;

        Ok(Self { config, http_client })
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<reqwest::Response, InferenceError> {
        let response = self.http_client.post(url).json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            log::debug!("Inference endpoint {} returned {}", url, status);
            return Err(InferenceError::Status(status));
        }

        Ok(response)
    }
}

impl InferenceBackend for InferenceClient {
    async fn predict(&self, features: &FeatureSet) -> Result<Prediction, InferenceError> {
        let response = self.post_json(&self.config.predict_url, features).await?;
        let prediction: Prediction = response.json().await?;

        if !prediction.reconstruction_error.is_finite() {
            return Err(InferenceError::Malformed(
                "reconstruction error is not finite".to_string(),
            ));
        }

        Ok(prediction)
    }

    async fn predict_batch(&self, batch: &[FeatureSet]) -> Result<Vec<Prediction>, InferenceError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let response = self.post_json(&self.config.batch_url(), batch).await?;
        let predictions = match response.json::<BatchResponse>().await? {
            BatchResponse::Bare(p) | BatchResponse::Wrapped { predictions: p } => p,
        };

        if predictions.len() != batch.len() {
            return Err(InferenceError::BatchLength {
                expected: batch.len(),
                actual: predictions.len(),
            });
        }

        Ok(predictions)
    }

    async fn health(&self) -> Result<UpstreamHealth, InferenceError> {
        let response = self.http_client.get(self.config.health_url()).send().await?;

        if !response.status().is_success() {
            return Err(InferenceError::Status(response.status().as_u16()));
        }

        Ok(response.json().await?)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn features() -> FeatureSet {
        FeatureSet::from_iter([("inter_arrival_time", 0.02), ("dns_rate", 4.0)])
    }

    fn client(server: &mockito::Server) -> InferenceClient {
        InferenceClient::new(InferenceConfig::new(format!("{}/predict", server.url()))).unwrap()
    }

    #[test]
    fn test_parses_integer_and_boolean_flags() {
        let p: Prediction =
            serde_json::from_str(r#"{"reconstruction_error": 0.3, "anomaly": 1}"#).unwrap();
        assert_eq!(p.anomaly, Some(true));

        let p: Prediction = serde_json::from_str(r#"{"anomaly_score": 0.3, "anomaly": false}"#).unwrap();
        assert_eq!(p.reconstruction_error, 0.3);
        assert_eq!(p.anomaly, Some(false));

        let p: Prediction = serde_json::from_str(r#"{"reconstruction_error": 0.3}"#).unwrap();
        assert_eq!(p.anomaly, None);

        assert!(serde_json::from_str::<Prediction>(r#"{"reconstruction_error": 0.3, "anomaly": 7}"#).is_err());
    }

    #[test]
    fn test_derived_urls() {
        let config = InferenceConfig::new("https://models.example/predict/");
        assert_eq!(config.base_url(), "https://models.example");
        assert_eq!(config.batch_url(), "https://models.example/predict_batch");
        assert_eq!(config.health_url(), "https://models.example/health");
    }

    #[tokio::test]
    async fn test_predict_posts_features() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/predict")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "dns_rate": 4.0,
                "inter_arrival_time": 0.02
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"reconstruction_error": 0.42, "anomaly": 1, "dns_rate": 4.0}"#)
            .create_async()
            .await;

        let prediction = client(&server).predict(&features()).await.unwrap();

        assert_eq!(prediction.reconstruction_error, 0.42);
        assert_eq!(prediction.anomaly, Some(true));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_predict_maps_server_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/predict")
            .with_status(500)
            .create_async()
            .await;

        let result = client(&server).predict(&features()).await;
        assert_eq!(result, Err(InferenceError::Status(500)));
    }

    #[tokio::test]
    async fn test_predict_rejects_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/predict")
            .with_status(200)
            .with_body(r#"{"status": "ok"}"#)
            .create_async()
            .await;

        let result = client(&server).predict(&features()).await;
        assert!(matches!(result, Err(InferenceError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_batch_checks_length() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/predict_batch")
            .with_status(200)
            .with_body(r#"{"predictions": [{"reconstruction_error": 0.1, "anomaly": 0}]}"#)
            .create_async()
            .await;

        let result = client(&server).predict_batch(&[features(), features()]).await;
        assert_eq!(result, Err(InferenceError::BatchLength { expected: 2, actual: 1 }));
    }

    #[tokio::test]
    async fn test_health() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(200)
            .with_body(r#"{"status": "healthy", "models_loaded": true}"#)
            .create_async()
            .await;

        let health = client(&server).health().await.unwrap();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.models_loaded, Some(true));
    }
}
