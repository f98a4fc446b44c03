mod support;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use content_studio::{
    creative::{CreativeStudio, EMPTY_PROMPT_MESSAGE},
    history::HistoryStore,
    routes::{router, AppState},
    storage::MemoryStore,
    studio::Studio,
};
use support::{shared, FakeService};

fn app(export_dir: std::path::PathBuf) -> (Router, Arc<FakeService>) {
    let service = shared(FakeService::new());
    let history = HistoryStore::load(Arc::new(MemoryStore::default()));
    let state = AppState {
        studio: Arc::new(Studio::new(service.clone(), history)),
        creative: Arc::new(CreativeStudio::new(service.clone())),
        export_dir,
    };
    (router(state), service)
}

async fn send(app: &Router, method: Method, uri: &str, content_type: Option<&str>, body: Body) -> (StatusCode, Vec<u8>) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(ct) = content_type {
        req = req.header(header::CONTENT_TYPE, ct);
    }
    let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = res.status();
    (status, to_bytes(res.into_body(), usize::MAX).await.unwrap().to_vec())
}

async fn send_json(app: &Router, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
    let (status, bytes) = send(app, method, uri, Some("application/json"), Body::from(body.to_string())).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn full_product_flow_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = app(dir.path().join("exports"));

    let (status, _) = send(&app, Method::POST, "/api/product/image", Some("image/png"), Body::from(vec![1u8, 2, 3])).await;
    assert_eq!(status, StatusCode::OK);

    let (status, snapshot) = send_json(&app, Method::PATCH, "/api/product/preferences", json!({ "field": "category", "value": "Shoes" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["preferences"]["category"], "Shoes");
    assert_eq!(snapshot["sourceImage"], "data:image/png;base64,AQID");

    let (_, outcome) = send_json(&app, Method::POST, "/api/product/text", Value::Null).await;
    assert_eq!(outcome, json!({ "status": "completed", "historyRecordId": null }));
    let (_, outcome) = send_json(&app, Method::POST, "/api/product/images", Value::Null).await;
    let id = outcome["historyRecordId"].as_str().unwrap().to_string();

    let (_, history) = send_json(&app, Method::GET, "/api/history", Value::Null).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["id"], id.as_str());

    let (status, text) = send(&app, Method::GET, "/api/product/export/text", None, Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(text).unwrap().starts_with("Product Name:\nTrail Runner"));

    let (_, plan) = send_json(&app, Method::GET, "/api/product/downloads", Value::Null).await;
    assert_eq!(plan[3], json!({ "index": 3, "fileName": "product-image-4.png", "delayMs": 600 }));

    let (status, _) = send(&app, Method::GET, "/api/product/images/0", None, Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, "/api/product/images/9", None, Body::empty()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, saved) = send_json(&app, Method::POST, "/api/product/images/save", Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["files"].as_array().unwrap().len(), 4);
    assert!(dir.path().join("exports/product-image-1.png").exists());

    let (status, _) = send(&app, Method::GET, "/api/product/export/pdf", None, Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn non_image_upload_is_rejected() {
    let (app, _) = app(std::env::temp_dir());
    let (status, _) = send(&app, Method::POST, "/api/product/image", Some("text/plain"), Body::from("hello")).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn history_load_and_clear() {
    let (app, _) = app(std::env::temp_dir());
    send(&app, Method::POST, "/api/product/image", Some("image/png"), Body::from(vec![9u8])).await;
    send_json(&app, Method::POST, "/api/product/text", Value::Null).await;
    let (_, outcome) = send_json(&app, Method::POST, "/api/product/images", Value::Null).await;
    let id = outcome["historyRecordId"].as_str().unwrap().to_string();

    let (status, snapshot) = send_json(&app, Method::POST, &format!("/api/history/{id}/load"), Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["progress"], "idle");
    let (status, _) = send_json(&app, Method::POST, "/api/history/nope/load", Value::Null).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, "/api/history", None, Body::empty()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, history) = send_json(&app, Method::GET, "/api/history", Value::Null).await;
    assert_eq!(history, json!([]));
}

#[tokio::test]
async fn creative_studio_over_http() {
    let (app, service) = app(std::env::temp_dir());

    let (_, state) = send_json(&app, Method::POST, "/api/creative", json!({ "prompt": "", "count": 2 })).await;
    assert_eq!(state["error"], EMPTY_PROMPT_MESSAGE);
    assert_eq!(service.creative_calls.load(std::sync::atomic::Ordering::SeqCst), 0);

    let (_, state) = send_json(&app, Method::POST, "/api/creative", json!({ "prompt": "a lighthouse", "count": 2 })).await;
    assert_eq!(state["images"].as_array().unwrap().len(), 2);
    assert_eq!(state["loading"], false);

    let (status, _) = send(&app, Method::GET, "/api/creative/images/1", None, Body::empty()).await;
    assert_eq!(status, StatusCode::OK);

    let (_, state) = send_json(&app, Method::POST, "/api/creative", json!({ "prompt": "forbidden thing" })).await;
    assert_eq!(state["images"], json!([]));
    assert!(state["error"].as_str().unwrap().contains("rejected"));

    // Creative results never reach history.
    let (_, history) = send_json(&app, Method::GET, "/api/history", Value::Null).await;
    assert_eq!(history, json!([]));
}
