use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use orc_store::MemStore;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::{router, ApiState};

fn app() -> axum::Router {
    let store = Arc::new(MemStore::new());
    router(ApiState::new(store), crate::DEFAULT_REQUEST_TIMEOUT)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn healthz_reports_ok() {
    let response = app()
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_then_get_pod_round_trips() {
    let app = app();
    let pod = json!({"id": "p1", "spec": {"containers": []}});
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/pods")
                .header("content-type", "application/json")
                .body(Body::from(pod.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["id"], "p1");
    assert_eq!(created["kind"], "Pod");

    let response = app
        .oneshot(Request::builder().uri("/api/v1/pods/p1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body_json(response).await;
    assert_eq!(fetched["id"], "p1");
}

#[tokio::test]
async fn get_missing_pod_is_404() {
    let response = app()
        .oneshot(Request::builder().uri("/api/v1/pods/ghost").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["reason"], "NotFound");
}

#[tokio::test]
async fn unknown_kind_is_404() {
    let response = app()
        .oneshot(Request::builder().uri("/api/v1/widgets").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_filters_by_label_selector() {
    let app = app();
    for (id, app_label) in [("a", "foo"), ("b", "bar")] {
        let pod = json!({"id": id, "labels": {"app": app_label}, "spec": {"containers": []}});
        app.clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/pods")
                    .header("content-type", "application/json")
                    .body(Body::from(pod.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
    }

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/pods?labels=app%3Dfoo")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], "a");
    assert!(body["resourceVersion"].is_string());
}

#[tokio::test]
async fn update_with_mismatched_body_id_is_invalid() {
    let app = app();
    let pod = json!({"id": "p1", "spec": {"containers": []}});
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/pods")
                .header("content-type", "application/json")
                .body(Body::from(pod.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let mismatched = json!({"id": "different", "spec": {"containers": []}});
    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/v1/pods/p1")
                .header("content-type", "application/json")
                .body(Body::from(mismatched.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn watch_stream_emits_added_event() {
    let app = app();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/watch/pods")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    tokio::task::yield_now().await;

    let pod = json!({"id": "p1", "spec": {"containers": []}});
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri("/api/v1/pods")
            .header("content-type", "application/json")
            .body(Body::from(pod.to_string()))
            .unwrap(),
    )
    .await
    .unwrap();

    let mut body = response.into_body().into_data_stream();
    let chunk = tokio::time::timeout(std::time::Duration::from_secs(1), async {
        use futures::StreamExt;
        body.next().await
    })
    .await
    .unwrap()
    .unwrap()
    .unwrap();
    let line = String::from_utf8(chunk.to_vec()).unwrap();
    assert!(line.contains("\"ADDED\""));
}
