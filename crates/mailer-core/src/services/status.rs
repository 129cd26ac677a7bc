/// Queue status reporting through a PostgREST remote procedure
use crate::constants::{MARK_EMAIL_SENT_RPC, RPC_PATH_PREFIX};
use crate::error::MailerError;
use crate::models::{QueueId, StatusReportConfig};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// Bound on a single status RPC
const RPC_TIMEOUT: Duration = Duration::from_secs(10);

#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait QueueStatusReporter: Send + Sync {
    /// Marks the queued email as sent (`success`) or failed with a reason
    async fn mark_email_sent(
        &self,
        queue_id: &QueueId,
        success: bool,
        error_message: Option<String>,
    ) -> Result<(), MailerError>;
}

#[derive(Debug, Serialize)]
struct MarkEmailSentArgs<'a> {
    queue_id: &'a QueueId,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<&'a str>,
}

/// Calls `mark_email_sent` on the Supabase REST endpoint
pub struct SupabaseStatusReporter {
    client: reqwest::Client,
    endpoint: Url,
    service_key: String,
}

impl SupabaseStatusReporter {
    pub fn new(config: &StatusReportConfig) -> Result<Self, MailerError> {
        let endpoint = rpc_endpoint(&config.base_url, MARK_EMAIL_SENT_RPC)?;
        let client = reqwest::Client::builder()
            .timeout(RPC_TIMEOUT)
            .build()
            .map_err(|e| MailerError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            service_key: config.service_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl QueueStatusReporter for SupabaseStatusReporter {
    #[tracing::instrument(
        name = "status.mark_email_sent",
        skip(self, queue_id, error_message),
        fields(queue_id = %queue_id)
    )]
    async fn mark_email_sent(
        &self,
        queue_id: &QueueId,
        success: bool,
        error_message: Option<String>,
    ) -> Result<(), MailerError> {
        let args = MarkEmailSentArgs {
            queue_id,
            success,
            error_message: error_message.as_deref(),
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(&args)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailerError::StatusReport(format!(
                "{} returned {}: {}",
                MARK_EMAIL_SENT_RPC, status, body
            )));
        }

        tracing::debug!("Queue status updated");
        Ok(())
    }
}

fn rpc_endpoint(base_url: &Url, function: &str) -> Result<Url, MailerError> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    base.join(&format!("{}/{}", RPC_PATH_PREFIX, function))
        .map_err(|e| MailerError::Config(format!("Invalid RPC endpoint: {}", e)))
}
