use std::net::SocketAddr;
use std::sync::Arc;

use anistream::config::Config;
use anistream::state::SharedState;
use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

/// State backed by an in-memory database and an unreachable source, so
/// every upstream call fails fast and exercises the degrade paths.
async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.source.base_url = "http://127.0.0.1:9".to_string();
    config.source.retry_attempts = 0;
    config.source.request_timeout_seconds = 1;
    config.cache.lock_wait_timeout = 1;
    config.dataset.enabled = false;

    let shared = Arc::new(
        SharedState::new(config)
            .await
            .expect("Failed to create app state"),
    );
    anistream::api::router(shared)
}

fn get(uri: &str) -> Request<Body> {
    let mut request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    // oneshot bypasses the connect-info make-service, so the socket addr
    // is injected by hand.
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));
    request
}

#[tokio::test]
async fn manifest_is_served() {
    let app = spawn_app().await;

    let response = app.oneshot(get("/manifest.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let manifest: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(manifest["id"], "org.anistream.addon");
    assert!(
        manifest["resources"]
            .as_array()
            .unwrap()
            .iter()
            .any(|r| r == "stream")
    );
}

#[tokio::test]
async fn malformed_stream_id_answers_200_with_no_streams() {
    let app = spawn_app().await;

    for uri in [
        "/stream/garbage",
        "/stream/as:slug",
        "/stream/tt123:s1e1.json",
    ] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload["streams"].as_array().unwrap().len(), 0, "{uri}");
    }
}

#[tokio::test]
async fn health_answers_ok_while_the_store_is_up() {
    let app = spawn_app().await;

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(payload["status"], "ok");
}

#[tokio::test]
async fn unknown_language_filter_is_rejected() {
    let app = spawn_app().await;

    let response = app
        .oneshot(get("/stream/as:demo:s1e1.json?language=klingon"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(payload["error"].as_str().unwrap().contains("klingon"));
}

#[tokio::test]
async fn unreachable_source_degrades_to_empty_streams() {
    let app = spawn_app().await;

    let response = app
        .oneshot(get("/stream/as:unknown-anime:s1e1.json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(payload["streams"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn unresolvable_meta_answers_200_with_null() {
    let app = spawn_app().await;

    let response = app.oneshot(get("/meta/as:unknown-anime.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(payload["meta"].is_null());
}
