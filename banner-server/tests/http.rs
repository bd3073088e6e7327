//! Exercises the HTTP surface end-to-end against in-memory fakes (no live
//! Postgres/Redis needed), covering the auth/status-code table in `spec.md`
//! §6 and the six end-to-end scenarios in §8.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use banner_core::mem::{MemCache, MemStore};
use banner_server::app::{router, AppState};
use banner_server::auth::PrefixTokenValidator;
use banner_sweeper::Sweeper;
use http_body_util::BodyExt as _;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};
use tower::ServiceExt as _;

/// `metrics::set_global_recorder` may only succeed once per process; every
/// test shares one handle rather than racing to install their own.
fn prometheus_handle() -> PrometheusHandle {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
    HANDLE
        .get_or_init(|| PrometheusBuilder::new().install_recorder().expect("install recorder"))
        .clone()
}

fn test_app() -> axum::Router {
    let store = Arc::new(MemStore::default());
    let cache = Arc::new(MemCache::new());
    let service = Arc::new(banner_service::BannerService::new(store.clone(), cache));
    let sweeper = Arc::new(Sweeper::new(store));

    let state = AppState {
        service,
        sweeper,
        token_validator: Arc::new(PrefixTokenValidator),
    };

    router(state, prometheus_handle())
}

const ADMIN_TOKEN: &str = "admin-test";
const USER_TOKEN: &str = "user-test";

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("token", token);
    }

    match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&value).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn happy_path_read() {
    let app = test_app();

    let create = request(
        "POST",
        "/api/v1/banner",
        Some(ADMIN_TOKEN),
        Some(json!({"feature_id": 1, "tag_ids": [2, 4, 3], "content": {"t": "a"}, "is_active": true})),
    );
    let response = app.clone().oneshot(create).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let read = request("GET", "/api/v1/user_banner?feature_id=1&tag_id=2", Some(USER_TOKEN), None);
    let response = app.oneshot(read).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"t": "a"}));
}

#[tokio::test]
async fn version_pin_reads_the_original_content() {
    let app = test_app();

    let create = request(
        "POST",
        "/api/v1/banner",
        Some(ADMIN_TOKEN),
        Some(json!({"feature_id": 1, "tag_ids": [2], "content": {"t": "a"}, "is_active": true})),
    );
    let response = app.clone().oneshot(create).await.unwrap();
    let banner_id = body_json(response).await["banner_id"].as_u64().unwrap();

    for body in [json!({"t": "b"}), json!({"t": "c"})] {
        let patch = request(
            "PATCH",
            &format!("/api/v1/banner/{banner_id}"),
            Some(ADMIN_TOKEN),
            Some(json!({"content": body})),
        );
        let response = app.clone().oneshot(patch).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let pinned = request(
        "GET",
        "/api/v1/user_banner?feature_id=1&tag_id=2&version=1&use_last_revision=true",
        Some(USER_TOKEN),
        None,
    );
    let response = app.oneshot(pinned).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"t": "a"}));
}

#[tokio::test]
async fn retention_keeps_exactly_three_versions() {
    let app = test_app();

    let create = request(
        "POST",
        "/api/v1/banner",
        Some(ADMIN_TOKEN),
        Some(json!({"feature_id": 1, "tag_ids": [2], "content": {"v": "p1"}, "is_active": true})),
    );
    let response = app.clone().oneshot(create).await.unwrap();
    let banner_id = body_json(response).await["banner_id"].as_u64().unwrap();

    for label in ["p2", "p3", "p4", "p5"] {
        let patch = request(
            "PATCH",
            &format!("/api/v1/banner/{banner_id}"),
            Some(ADMIN_TOKEN),
            Some(json!({"content": {"v": label}})),
        );
        app.clone().oneshot(patch).await.unwrap();
    }

    let list = request("GET", "/api/v1/banner", Some(ADMIN_TOKEN), None);
    let response = app.oneshot(list).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let banners = body_json(response).await;
    let banner = banners.as_array().unwrap().iter().find(|b| b["id"] == banner_id).unwrap();
    let versions = banner["versions"].as_array().unwrap();

    assert_eq!(versions.len(), 3);
    let labels: Vec<&str> = versions.iter().map(|v| v["content"]["v"].as_str().unwrap()).collect();
    assert_eq!(labels, vec!["p3", "p4", "p5"]);
}

#[tokio::test]
async fn uniqueness_on_create_conflicts() {
    let app = test_app();

    let first = request(
        "POST",
        "/api/v1/banner",
        Some(ADMIN_TOKEN),
        Some(json!({"feature_id": 2, "tag_ids": [2, 4, 3], "content": {}, "is_active": true})),
    );
    assert_eq!(app.clone().oneshot(first).await.unwrap().status(), StatusCode::CREATED);

    let second = request(
        "POST",
        "/api/v1/banner",
        Some(ADMIN_TOKEN),
        Some(json!({"feature_id": 2, "tag_ids": [2], "content": {}, "is_active": true})),
    );
    assert_eq!(app.oneshot(second).await.unwrap().status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn filter_delete_then_last_revision_read_is_not_found() {
    let app = test_app();

    let create = request(
        "POST",
        "/api/v1/banner",
        Some(ADMIN_TOKEN),
        Some(json!({"feature_id": 1, "tag_ids": [2], "content": {"t": "a"}, "is_active": true})),
    );
    app.clone().oneshot(create).await.unwrap();

    // Populate the cache.
    let read = request("GET", "/api/v1/user_banner?feature_id=1&tag_id=2", Some(USER_TOKEN), None);
    assert_eq!(app.clone().oneshot(read).await.unwrap().status(), StatusCode::OK);

    let delete = request("DELETE", "/api/v1/filter_banner?feature_id=1", Some(ADMIN_TOKEN), None);
    assert_eq!(app.clone().oneshot(delete).await.unwrap().status(), StatusCode::NO_CONTENT);

    let fresh_read = request(
        "GET",
        "/api/v1/user_banner?feature_id=1&tag_id=2&use_last_revision=true",
        Some(USER_TOKEN),
        None,
    );
    assert_eq!(app.oneshot(fresh_read).await.unwrap().status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_route_with_user_token_is_forbidden() {
    let app = test_app();
    let request = request("GET", "/api/v1/banner", Some(USER_TOKEN), None);
    assert_eq!(app.oneshot(request).await.unwrap().status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_route_with_no_token_is_unauthorized() {
    let app = test_app();
    let request = request("GET", "/api/v1/banner", None, None);
    assert_eq!(app.oneshot(request).await.unwrap().status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn user_route_with_admin_token_is_forbidden() {
    let app = test_app();
    let request = request(
        "GET",
        "/api/v1/user_banner?feature_id=1&tag_id=2",
        Some(ADMIN_TOKEN),
        None,
    );
    assert_eq!(app.oneshot(request).await.unwrap().status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn create_with_non_object_content_is_bad_request() {
    let app = test_app();
    let create = request(
        "POST",
        "/api/v1/banner",
        Some(ADMIN_TOKEN),
        Some(json!({"feature_id": 1, "tag_ids": [2], "content": "not an object", "is_active": true})),
    );
    assert_eq!(app.oneshot(create).await.unwrap().status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_unknown_banner_is_not_found() {
    let app = test_app();
    let delete = request("DELETE", "/api/v1/banner/999", Some(ADMIN_TOKEN), None);
    assert_eq!(app.oneshot(delete).await.unwrap().status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn token_endpoints_mint_prefixed_tokens() {
    let app = test_app();

    let admin = request("GET", "/api/v1/token/admin", None, None);
    let response = app.clone().oneshot(admin).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8(bytes.to_vec()).unwrap().starts_with("admin-"));

    let user = request("GET", "/api/v1/token/user", None, None);
    let response = app.oneshot(user).await.unwrap();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8(bytes.to_vec()).unwrap().starts_with("user-"));
}
