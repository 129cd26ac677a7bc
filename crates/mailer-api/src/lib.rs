/// Mailer API - send-email Lambda function
///
/// Accepts direct API calls and database webhooks, sends the welcome email
/// over SMTP and reports the outcome back to the email queue.
pub mod api;
pub mod context;
pub mod error;
pub mod middleware;

pub use context::ApiContext;
pub use error::ApiError;

use axum::{
    Router,
    body::Body as AxumBody,
    http::{HeaderName, Method, header},
    middleware as axum_middleware,
    routing::post,
};
use lambda_http::{Body, Error as LambdaError, Request, Response};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Builds the router; every OPTIONS request is answered by the CORS layer
pub fn router(ctx: Arc<ApiContext>) -> Router {
    Router::new()
        .route("/", post(api::send::send))
        .route("/{*path}", post(api::send::send))
        .route_layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(cors_layer())
        .with_state(ctx)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            header::CONTENT_TYPE,
        ])
}

/// Main handler - converts the Lambda HTTP request to an axum request
pub async fn handler(ctx: Arc<ApiContext>, event: Request) -> Result<Response<Body>, LambdaError> {
    info!("Processing request: {} {}", event.method(), event.uri().path());

    let (parts, body) = event.into_parts();
    let axum_request = http::Request::from_parts(parts, AxumBody::from(body.to_vec()));

    let response = match router(ctx).oneshot(axum_request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    let (parts, body) = response.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX).await?;

    // JSON bodies go back as text so API Gateway does not base64 them
    let body = match String::from_utf8(body_bytes.to_vec()) {
        Ok(text) if text.is_empty() => Body::Empty,
        Ok(text) => Body::Text(text),
        Err(e) => Body::Binary(e.into_bytes()),
    };

    Ok(Response::from_parts(parts, body))
}
