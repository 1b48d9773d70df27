//! Error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use sentinel_core::logic::journal::WindowError;
use sentinel_core::logic::model::ThresholdError;
use sentinel_core::logic::timeseries::{FluxError, SourceError};
use sentinel_core::{AlertError, IngestError, InferenceError, JournalError};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Validation errors
    ValidationError(String),

    // Optional feature not configured
    ServiceUnavailable(String),

    // Inference endpoint failed; the sample was dropped
    UpstreamUnavailable(String),

    // Database errors
    DatabaseError(String),

    // External service errors
    ExternalServiceError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.as_str()),
            AppError::UpstreamUnavailable(msg) => {
                tracing::warn!("Inference upstream unavailable: {}", msg);
                (StatusCode::BAD_GATEWAY, "Inference service unavailable, sample dropped")
            }
            AppError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error occurred")
            }
            AppError::ExternalServiceError(msg) => {
                tracing::error!("External service error: {}", msg);
                (StatusCode::BAD_GATEWAY, "External service error")
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::InvalidSample(_) | IngestError::InvalidBatchSample { .. } => {
                AppError::ValidationError(err.to_string())
            }
            IngestError::UpstreamUnavailable(e) => AppError::UpstreamUnavailable(e.to_string()),
        }
    }
}

impl From<InferenceError> for AppError {
    fn from(err: InferenceError) -> Self {
        AppError::ExternalServiceError(err.to_string())
    }
}

impl From<ThresholdError> for AppError {
    fn from(err: ThresholdError) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<WindowError> for AppError {
    fn from(err: WindowError) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<JournalError> for AppError {
    fn from(err: JournalError) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<SourceError> for AppError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Query(e) => AppError::from(e),
            other => AppError::ExternalServiceError(other.to_string()),
        }
    }
}

impl From<FluxError> for AppError {
    fn from(err: FluxError) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<AlertError> for AppError {
    fn from(err: AlertError) -> Self {
        AppError::ExternalServiceError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}
