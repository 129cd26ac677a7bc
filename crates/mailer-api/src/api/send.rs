/// Send-email endpoint
use axum::{Json, body::Bytes, extract::State};
use mailer_core::MailerError;
use mailer_core::models::{Payload, QueueId, ResolvedRequest};
use mailer_core::utils::{extract_domain, redact_body};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{context::ApiContext, error::ApiError};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub success: bool,
    pub message: String,
    /// Always present; `null` when the request did not come from the queue
    pub queue_id: Option<QueueId>,
    pub timestamp: String,
}

/// POST handler: classify the body, send the welcome email, report the outcome
pub async fn send(
    State(ctx): State<Arc<ApiContext>>,
    body: Bytes,
) -> Result<Json<SendResponse>, ApiError> {
    info!(body = %redact_body(&body), "Received send-email request");

    let value: Value = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Rejecting malformed JSON body");
        ApiError::InvalidJson
    })?;

    let payload = Payload::classify(value);
    info!(
        kind = payload.kind(),
        queue_id = ?payload.queue_id().map(ToString::to_string),
        "Classified request payload"
    );

    let ResolvedRequest { request, queue_id } = payload.resolve().inspect_err(|e| {
        warn!(error = %e, "Rejecting request");
    })?;

    info!(
        recipient_domain = extract_domain(&request.email),
        user_id = ?request.id,
        "Sending welcome email"
    );
    let outcome = ctx.sender.send_welcome(&request).await;

    if let Some(queue_id) = &queue_id {
        report_outcome(&ctx, queue_id, &outcome).await;
    }

    match outcome {
        Ok(()) => Ok(Json(SendResponse {
            success: true,
            message: format!("Email sent to {}", request.email),
            queue_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
        })),
        Err(e) => {
            error!(error = %e, "Failed to send email");
            Err(e.into())
        }
    }
}

/// Best-effort queue update; a failure here never changes the response
async fn report_outcome(
    ctx: &ApiContext,
    queue_id: &QueueId,
    outcome: &Result<(), MailerError>,
) {
    let Some(reporter) = &ctx.reporter else {
        debug!(queue_id = %queue_id, "Status reporting not configured, skipping");
        return;
    };

    let (success, error_message) = match outcome {
        Ok(()) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };

    match reporter
        .mark_email_sent(queue_id, success, error_message)
        .await
    {
        Ok(()) => info!(queue_id = %queue_id, success, "Updated email queue status"),
        Err(e) => warn!(queue_id = %queue_id, error = %e, "Failed to update email queue status"),
    }
}
