#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use scorm_engine::{config::Config, create_router, services::AppState, MemoryScormStore};

pub const COURSE_ID: &str = "course-v1:TestX+T101+2024_T1";
pub const ACTIVITY_ID: &str = "block-v1:TestX+T101+2024_T1+type@scorm+block@block123";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryScormStore>,
}

pub fn create_test_app() -> TestApp {
    create_test_app_with_config(Config::default())
}

pub fn create_test_app_with_config(config: Config) -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let store = Arc::new(MemoryScormStore::new());
    let app_state = Arc::new(AppState::new(config, store.clone()));

    TestApp {
        router: create_router(app_state),
        store,
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&body).into_owned())
        })
    };
    (status, json)
}

pub async fn post_events(router: &Router, user_id: &str, events: Value) -> (StatusCode, Value) {
    post_json(
        router,
        serde_json::json!({
            "user_id": user_id,
            "course_id": COURSE_ID,
            "activity_id": ACTIVITY_ID,
            "events": events,
        }),
    )
    .await
}

pub async fn post_json(router: &Router, body: Value) -> (StatusCode, Value) {
    send(
        router,
        Request::builder()
            .method("POST")
            .uri("/api/v1/scorm/events")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
    )
    .await
}

pub fn state_uri(user_id: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("user_id", user_id)
        .append_pair("course_id", COURSE_ID)
        .append_pair("activity_id", ACTIVITY_ID)
        .finish();
    format!("/api/v1/scorm/state?{}", query)
}

pub async fn get_state(router: &Router, user_id: &str) -> (StatusCode, Value) {
    send(
        router,
        Request::builder()
            .method("GET")
            .uri(state_uri(user_id))
            .body(Body::empty())
            .unwrap(),
    )
    .await
}
