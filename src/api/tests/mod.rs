use super::*;
use crate::config::RangeDefaults;
use crate::downloader::test_helpers::{Scripted, ScriptedFetcher, create_test_downloader, test_config};
use crate::error::ApiError;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;


/// Router over a scripted fetcher with the given request defaults
fn scripted_app(
    script: impl IntoIterator<Item = (u64, Scripted)>,
    defaults: RangeDefaults,
) -> (Router, Arc<RangeDownloader>, Arc<ScriptedFetcher>, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = test_config("http://127.0.0.1:9/unused", &temp_dir);
    config.defaults = defaults;

    let fetcher = Arc::new(ScriptedFetcher::new(script));
    let downloader = Arc::new(RangeDownloader::with_fetcher(config, fetcher.clone()));
    let app = create_router(downloader.clone(), downloader.get_config());
    (app, downloader, fetcher, temp_dir)
}

fn no_delay_defaults() -> RangeDefaults {
    RangeDefaults {
        start: 0,
        end: 2,
        delay_ms: 0,
    }
}

fn post_download(body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/download")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn api_error_of(response: axum::response::Response) -> ApiError {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn test_api_server_shuts_down_gracefully() {
    let (downloader, _temp_dir) = create_test_downloader("http://127.0.0.1:9/unused");
    let downloader = Arc::new(downloader);

    let mut config = (*downloader.get_config()).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(start_api_server_with_shutdown(downloader, config, async {
        shutdown_rx.await.ok();
    }));

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown_tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(2), server)
        .await
        .expect("server should stop after the shutdown signal")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_spawn_api_server_method() {
    let (downloader, _temp_dir) = create_test_downloader("http://127.0.0.1:9/unused");
    let mut config = (*downloader.get_config()).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let downloader = Arc::new(RangeDownloader::new(config).unwrap());

    let api_handle = downloader.spawn_api_server();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!api_handle.is_finished(), "server should still be running");
    api_handle.abort();
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _downloader, _fetcher, _temp_dir) = scripted_app([], no_delay_defaults());

    let response = app.oneshot(get_request("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_openapi_endpoint() {
    let (app, _downloader, _fetcher, _temp_dir) = scripted_app([], no_delay_defaults());

    let response = app.oneshot(get_request("/api/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert!(json["paths"].get("/api/download").is_some());
}

#[tokio::test]
async fn test_swagger_ui_follows_config() {
    let (app, downloader, _fetcher, _temp_dir) = scripted_app([], no_delay_defaults());
    let response = app.oneshot(get_request("/api-docs/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut config = (*downloader.get_config()).clone();
    config.server.api.swagger_ui = false;
    let app = create_router(downloader, Arc::new(config));
    let response = app.oneshot(get_request("/api-docs/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_enabled() {
    let (app, _downloader, _fetcher, _temp_dir) = scripted_app([], no_delay_defaults());

    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (_app, downloader, _fetcher, _temp_dir) = scripted_app([], no_delay_defaults());
    let mut config = (*downloader.get_config()).clone();
    config.server.api.cors_enabled = false;
    let app = create_router(downloader, Arc::new(config));

    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let (_app, downloader, _fetcher, _temp_dir) = scripted_app([], no_delay_defaults());
    let mut config = (*downloader.get_config()).clone();
    config.server.api.cors_origins = vec!["http://allowed.example".to_string()];
    let app = create_router(downloader, Arc::new(config));

    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://allowed.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://allowed.example"
    );
}
