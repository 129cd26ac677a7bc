/// SMTP email sending service
use crate::email::compose_welcome;
use crate::error::MailerError;
use crate::models::{EmailRequest, SmtpConfig};
use crate::smtp::{Envelope, SmtpSession, connect};
use crate::utils::logging::redact_email;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{error, info, warn};

#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Delivers the welcome email to the request's recipient
    async fn send_welcome(&self, request: &EmailRequest) -> Result<(), MailerError>;
}

/// Sends over a fresh SMTP connection per message
pub struct SmtpEmailSender {
    config: SmtpConfig,
}

impl SmtpEmailSender {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    #[tracing::instrument(
        name = "smtp.send_welcome",
        skip(self, request),
        fields(recipient = %redact_email(&request.email))
    )]
    async fn send_welcome(&self, request: &EmailRequest) -> Result<(), MailerError> {
        let credentials = self.config.credentials()?;
        let message = compose_welcome(&self.config.sender_name, credentials.username, request)?;

        info!(smtp = %self.config.address(), "Connecting to SMTP server");
        let stream = connect(&self.config).await?;

        let envelope = Envelope {
            credentials,
            from: credentials.username,
            to: &request.email,
            message: &message,
        };
        deliver(stream, &self.config, &envelope).await?;

        info!("Email sent successfully via SMTP");
        Ok(())
    }
}

/// Runs one SMTP dialogue over an open stream, then closes it
///
/// A close failure is logged and never replaces the dialogue's result.
async fn deliver<S>(
    stream: S,
    config: &SmtpConfig,
    envelope: &Envelope<'_>,
) -> Result<(), MailerError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut session = SmtpSession::new(stream, config.ehlo_name.as_str(), config.timeout);
    let result = session.run(envelope).await;

    if let Err(e) = &result {
        error!(
            stage = %session.state(),
            transport = e.is_transport_error(),
            error = %e,
            "SMTP exchange failed"
        );
    }

    if let Err(close_err) = session.close().await {
        warn!(error = %close_err, "Error closing SMTP connection");
    }

    result
}
