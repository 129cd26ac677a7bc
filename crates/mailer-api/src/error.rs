/// API Error types
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mailer_core::MailerError;
use mailer_core::models::RequestRejection;
use serde_json::{Value, json};

/// API Error
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid JSON in request body")]
    InvalidJson,

    #[error("{message}")]
    BadRequest {
        message: String,
        /// Echo of the resolved payload, when useful to the caller
        received: Option<Value>,
    },

    #[error("Failed to send email: {0}")]
    SendFailed(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidJson | ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::SendFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::InvalidJson => json!({
                "error": "Invalid JSON in request body",
            }),
            ApiError::BadRequest {
                message,
                received: Some(received),
            } => json!({
                "error": message,
                "received": received,
            }),
            ApiError::BadRequest {
                message,
                received: None,
            } => json!({
                "error": message,
            }),
            ApiError::SendFailed(details) => json!({
                "error": "Failed to send email",
                "details": details,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<RequestRejection> for ApiError {
    fn from(rejection: RequestRejection) -> Self {
        let message = rejection.to_string();
        match rejection {
            RequestRejection::MissingFields { received } => ApiError::BadRequest {
                message,
                received: Some(received),
            },
            RequestRejection::InvalidEmail(_) => ApiError::BadRequest {
                message,
                received: None,
            },
        }
    }
}

/// Convert mailer-core errors to API errors
impl From<MailerError> for ApiError {
    fn from(err: MailerError) -> Self {
        ApiError::SendFailed(err.to_string())
    }
}
