//! Router tests against a mocked inference endpoint and in-memory SQLite

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

use crate::config::Config;
use crate::{build_state, create_router, db, AppState};

const PREDICT_ANOMALY: &str = r#"{"reconstruction_error": 0.5, "anomaly": 1}"#;

async fn state_with(server: &mockito::Server, extra: &[(&str, String)]) -> AppState {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::run_migrations(&pool).await.unwrap();

    let mut vars = vec![("INFERENCE_URL", format!("{}/predict", server.url()))];
    vars.extend(extra.iter().cloned());

    let config = Config::from_lookup(|key| {
        vars.iter().find(|(k, _)| *k == key).map(|(_, v)| v.clone())
    })
    .unwrap();

    build_state(config, pool).unwrap()
}

async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
    let app: Router = create_router(state.clone());
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn with_json(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn dns_sample(rate: f64) -> Value {
    json!({ "features": { "inter_arrival_time": 0.02, "dns_rate": rate } })
}

#[tokio::test]
async fn test_health_reports_variant() {
    let server = mockito::Server::new_async().await;
    let state = state_with(&server, &[]).await;

    let (status, body) = send(&state, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["variant"], "dns");
    assert_eq!(body["live_polling"], false);
}

#[tokio::test]
async fn test_upstream_health_proxies_endpoint() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/health")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status": "ok", "models_loaded": true}"#)
        .create_async()
        .await;
    let state = state_with(&server, &[]).await;

    let (status, body) = send(&state, get("/api/v1/upstream/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["models_loaded"], true);
}

#[tokio::test]
async fn test_anomaly_is_stored_logged_and_alerted() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/predict")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(PREDICT_ANOMALY)
        .create_async()
        .await;
    let hook = server
        .mock("POST", "/hook")
        .with_status(204)
        .expect(1)
        .create_async()
        .await;
    let state = state_with(
        &server,
        &[
            ("ALERT_WEBHOOK_URL", format!("{}/hook", server.url())),
            ("ALERT_PLATFORM", "generic".to_string()),
        ],
    )
    .await;

    let (status, body) = send(&state, with_json("POST", "/api/v1/predictions", dns_sample(4.0))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["record"]["is_anomaly"], true);
    assert_eq!(body["warnings"], json!([]));
    assert_eq!(state.session.len(), 1);
    hook.assert_async().await;

    let (status, history) = send(&state, get("/api/v1/history?window=-1h")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["summary"]["total_records"], 1);
    assert_eq!(history["entries"][0]["protocol"], "DNS");
    assert_eq!(history["entries"][0]["source_ip"], "N/A");

    let (_, alerts) = send(&state, get("/api/v1/alerts")).await;
    assert_eq!(alerts["configured"], true);
    assert_eq!(alerts["stats"]["alerts_sent"], 1);
}

#[tokio::test]
async fn test_invalid_sample_is_rejected_without_upstream_call() {
    let mut server = mockito::Server::new_async().await;
    let predict = server
        .mock("POST", "/predict")
        .expect(0)
        .create_async()
        .await;
    let state = state_with(&server, &[]).await;

    let request = with_json(
        "POST",
        "/api/v1/predictions",
        json!({ "features": { "inter_arrival_time": 0.02 } }),
    );
    let (status, body) = send(&state, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert!(state.session.is_empty());
    predict.assert_async().await;
}

#[tokio::test]
async fn test_upstream_failure_drops_sample() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/predict")
        .with_status(500)
        .create_async()
        .await;
    let state = state_with(&server, &[]).await;

    let (status, body) = send(&state, with_json("POST", "/api/v1/predictions", dns_sample(4.0))).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Inference service unavailable, sample dropped");
    assert!(state.session.is_empty());

    let (_, history) = send(&state, get("/api/v1/history")).await;
    assert_eq!(history["summary"]["total_records"], 0);
}

#[tokio::test]
async fn test_listing_pages_newest_first() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/predict")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"reconstruction_error": 0.01, "anomaly": 0}"#)
        .create_async()
        .await;
    let state = state_with(&server, &[("PAGE_SIZE", "2".to_string())]).await;

    for rate in [1.0, 2.0, 3.0] {
        let (status, _) = send(&state, with_json("POST", "/api/v1/predictions", dns_sample(rate))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, first) = send(&state, get("/api/v1/predictions")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["total_pages"], 2);
    assert_eq!(first["total_records"], 3);
    assert_eq!(first["items"][0]["features"]["dns_rate"], 3.0);
    assert_eq!(first["items"][0]["highlight"], false);

    let (_, second) = send(&state, get("/api/v1/predictions?page=2&order=arrival")).await;
    assert_eq!(second["items"].as_array().unwrap().len(), 1);
    assert_eq!(second["items"][0]["features"]["dns_rate"], 3.0);
}

#[tokio::test]
async fn test_threshold_change_keeps_stored_flags() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/predict")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"reconstruction_error": 0.75, "anomaly": 1}"#)
        .create_async()
        .await;
    let state = state_with(&server, &[("ANOMALY_THRESHOLD", "0.8".to_string())]).await;

    let (_, created) = send(&state, with_json("POST", "/api/v1/predictions", dns_sample(4.0))).await;
    assert_eq!(created["record"]["is_anomaly"], false);

    let (status, settings) = send(
        &state,
        with_json("PUT", "/api/v1/settings", json!({ "threshold": 0.5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["threshold"], 0.5);

    let (_, page) = send(&state, get("/api/v1/predictions")).await;
    assert_eq!(page["items"][0]["is_anomaly"], false);
    assert_eq!(page["items"][0]["exceeds_current_threshold"], true);
}

#[tokio::test]
async fn test_negative_threshold_is_rejected() {
    let server = mockito::Server::new_async().await;
    let state = state_with(&server, &[]).await;

    let (status, _) = send(
        &state,
        with_json("PUT", "/api/v1/settings", json!({ "threshold": -1.0 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(state.session.threshold(), 0.1);
}

#[tokio::test]
async fn test_batch_ingest_keeps_request_order() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/predict_batch")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"predictions": [
                {"reconstruction_error": 0.02, "anomaly": 0},
                {"reconstruction_error": 0.9, "anomaly": 1}
            ]}"#,
        )
        .create_async()
        .await;
    let state = state_with(&server, &[]).await;

    let request = with_json(
        "POST",
        "/api/v1/predictions/batch",
        json!({ "samples": [dns_sample(1.0), dns_sample(9.0)] }),
    );
    let (status, body) = send(&state, request).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body[0]["record"]["is_anomaly"], false);
    assert_eq!(body[1]["record"]["is_anomaly"], true);
    assert_eq!(state.session.len(), 2);

    let (_, stats) = send(&state, get("/api/v1/stats")).await;
    assert_eq!(stats["stats"]["stored_anomalies"], 1);
    assert_eq!(stats["buffer"]["current_size"], 2);
    assert!(stats["alerts"].is_null());
}

#[tokio::test]
async fn test_empty_batch_is_rejected() {
    let server = mockito::Server::new_async().await;
    let state = state_with(&server, &[]).await;

    let request = with_json("POST", "/api/v1/predictions/batch", json!({ "samples": [] }));
    let (status, _) = send(&state, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unconfigured_features_are_unavailable() {
    let server = mockito::Server::new_async().await;
    let state = state_with(&server, &[]).await;

    let (status, _) = send(&state, get("/api/v1/traffic")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = send(&state, with_json("POST", "/api/v1/alerts/test", json!({}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_bad_history_window() {
    let server = mockito::Server::new_async().await;
    let state = state_with(&server, &[]).await;

    let (status, body) = send(&state, get("/api/v1/history?window=yesterday")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_oversized_history_window_is_rejected() {
    let server = mockito::Server::new_async().await;
    let state = state_with(&server, &[]).await;

    let (status, body) = send(&state, get("/api/v1/history?window=-9999999999d")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);

    let (status, _) = send(&state, get("/api/v1/history?window=-365d")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_batch_size_limits() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/predict_batch")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"predictions": [{"reconstruction_error": 0.02, "anomaly": 0}]}"#)
        .create_async()
        .await;
    let state = state_with(&server, &[]).await;

    let samples: Vec<Value> = (0..1001).map(|i| dns_sample(i as f64)).collect();
    let (status, _) = send(
        &state,
        with_json("POST", "/api/v1/predictions/batch", json!({ "samples": samples })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &state,
        with_json("POST", "/api/v1/predictions/batch", json!({ "samples": [dns_sample(1.0)] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_traffic_requires_both_bounds() {
    let server = mockito::Server::new_async().await;
    let state = state_with(
        &server,
        &[
            ("INFLUXDB_URL", server.url()),
            ("INFLUXDB_ORG", "lab".to_string()),
            ("INFLUXDB_TOKEN", "secret".to_string()),
            ("INFLUXDB_BUCKET", "traffic".to_string()),
        ],
    )
    .await;

    let (status, _) = send(&state, get("/api/v1/traffic?start=2024-06-01T00:00:00Z")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}
