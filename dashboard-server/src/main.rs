//! Traffic Sentinel Dashboard Server
//!
//! HTTP front end for one monitoring deployment (DNS or DoS).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    TRAFFIC SENTINEL                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌──────────────┐   ┌─────────────────────┐  │
//! │  │  API      │   │  Session     │   │  Live Polling       │  │
//! │  │  (Axum)   │──►│  (buffer +   │◄──│  (Background Job)   │  │
//! │  │           │   │   settings)  │   │                     │  │
//! │  └─────┬─────┘   └──────┬───────┘   └──────────┬──────────┘  │
//! │        │                ▼                      ▼             │
//! │        │         ┌─────────────┐        ┌─────────────┐      │
//! │        └────────►│   SQLite    │        │  InfluxDB   │      │
//! │                  └─────────────┘        └─────────────┘      │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod error;
mod handlers;
mod jobs;
mod models;

#[cfg(test)]
mod tests;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sentinel_core::{
    ClassificationSettings, InferenceClient, Pipeline, Session, TimeSeriesClient, WebhookNotifier,
};

pub use error::{AppError, AppResult};

use crate::config::Config;
use crate::models::SqlJournal;

/// Pipeline wired to the production services
pub type AppPipeline = Pipeline<InferenceClient, SqlJournal, WebhookNotifier>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    init_logging();

    let config = Config::from_env().context("Invalid configuration")?;

    tracing::info!("{} v{} starting...", sentinel_core::constants::APP_NAME, sentinel_core::constants::APP_VERSION);
    tracing::info!("Variant: {}", config.variant);
    tracing::info!("Database: {}", config.database_display());

    // Initialize database pool
    let pool = db::create_pool(&config.database_url)
        .await
        .context("Failed to create database pool")?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    // Build application state
    let state = build_state(config, pool)?;
    if jobs::spawn_live_polling(&state).is_none() {
        tracing::info!("Time-series source not configured, live polling disabled");
    }
    if state.pipeline.alerts().is_none() {
        tracing::info!("Alert webhook not configured, alerts disabled");
    }

    // Build router
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let app = create_router(state);

    // Start server
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// `LOG_FORMAT=json` switches to structured output
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sentinel_dashboard=debug,sentinel_core=info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: Arc<Session>,
    pub pipeline: Arc<AppPipeline>,
    pub timeseries: Option<Arc<TimeSeriesClient>>,
}

/// Wire the outbound clients and the session from configuration
fn build_state(config: Config, pool: sqlx::SqlitePool) -> anyhow::Result<AppState> {
    let inference = InferenceClient::new(config.inference.clone())?;
    let journal = SqlJournal::new(pool, config.variant);
    let alerts = config.webhook.clone().map(WebhookNotifier::new).transpose()?;
    let timeseries = config
        .timeseries
        .clone()
        .map(TimeSeriesClient::new)
        .transpose()?
        .map(Arc::new);

    let mut settings = ClassificationSettings::new(config.threshold, config.flag_source)?;
    settings.alerts_enabled = config.alerts_enabled;

    let session = Session::new(config.buffer_capacity, config.page_size, settings);
    let pipeline = Pipeline::new(config.variant, inference, journal, alerts)
        .with_required_features(config.required_features.clone());

    Ok(AppState {
        config: Arc::new(config),
        session: Arc::new(session),
        pipeline: Arc::new(pipeline),
        timeseries,
    })
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Upstream
        .route("/api/v1/upstream/health", get(handlers::health::upstream))

        // Predictions
        .route("/api/v1/predictions", get(handlers::predictions::list))
        .route("/api/v1/predictions", post(handlers::predictions::create))
        .route("/api/v1/predictions/batch", post(handlers::predictions::create_batch))

        // Settings
        .route("/api/v1/settings", get(handlers::settings::get).put(handlers::settings::update))

        // Reports
        .route("/api/v1/stats", get(handlers::stats::get))
        .route("/api/v1/history", get(handlers::history::get))
        .route("/api/v1/traffic", get(handlers::traffic::get))

        // Alerts
        .route("/api/v1/alerts", get(handlers::alerts::get))
        .route("/api/v1/alerts/test", post(handlers::alerts::test));

    // Combine all routes
    Router::new()
        .route("/health", get(handlers::health::check))
        .merge(api_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
