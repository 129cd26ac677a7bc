//! Shared helpers for API integration tests
#![allow(dead_code)]

use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use mailer_api::{ApiContext, router};
use mailer_core::services::{EmailSender, MockEmailSender, MockQueueStatusReporter, QueueStatusReporter};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub fn context(
    sender: MockEmailSender,
    reporter: Option<MockQueueStatusReporter>,
) -> Arc<ApiContext> {
    ApiContext::with_services(
        Arc::new(sender) as Arc<dyn EmailSender>,
        reporter.map(|r| Arc::new(r) as Arc<dyn QueueStatusReporter>),
    )
}

pub fn post(body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/")
        .header("content-type", "application/json")
        .header("origin", "https://app.example.com")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn preflight() -> Request<Body> {
    Request::builder()
        .method(Method::OPTIONS)
        .uri("/")
        .header("origin", "https://app.example.com")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "authorization, content-type")
        .body(Body::empty())
        .unwrap()
}

pub async fn call(ctx: Arc<ApiContext>, request: Request<Body>) -> TestResponse {
    let response = router(ctx).oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    TestResponse {
        status,
        headers,
        body,
    }
}

pub fn webhook_body(queue_id: Value) -> String {
    serde_json::json!({
        "type": "INSERT",
        "table": "user_email_queue",
        "record": {
            "id": queue_id,
            "name": "Ana",
            "email": "ana@x.com",
            "user_id": "u-1"
        }
    })
    .to_string()
}
