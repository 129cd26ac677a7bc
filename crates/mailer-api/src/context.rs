/// API Context - shared state for the send handler
use lambda_http::Error;
use mailer_core::models::MailerConfig;
use mailer_core::services::{
    EmailSender, QueueStatusReporter, SmtpEmailSender, SupabaseStatusReporter, config,
};
use std::sync::Arc;
use tracing::info;

/// Immutable collaborators shared by every invocation
#[derive(Clone)]
pub struct ApiContext {
    /// Delivers the welcome email
    pub sender: Arc<dyn EmailSender>,

    /// Queue status reporter; `None` when Supabase is not configured
    pub reporter: Option<Arc<dyn QueueStatusReporter>>,
}

impl ApiContext {
    /// Builds the context from environment variables
    pub fn new() -> Result<Arc<Self>, Error> {
        let config = config::load_from_env()?;
        Self::from_config(config)
    }

    /// Wires the production SMTP sender and, if configured, the Supabase reporter
    pub fn from_config(config: MailerConfig) -> Result<Arc<Self>, Error> {
        let reporter = match &config.status {
            Some(status) => {
                let reporter = SupabaseStatusReporter::new(status)?;
                info!(endpoint = %reporter.endpoint(), "Queue status reporting enabled");
                Some(Arc::new(reporter) as Arc<dyn QueueStatusReporter>)
            }
            None => None,
        };

        Ok(Self::with_services(
            Arc::new(SmtpEmailSender::new(config.smtp)),
            reporter,
        ))
    }

    /// Assembles a context from already constructed collaborators
    pub fn with_services(
        sender: Arc<dyn EmailSender>,
        reporter: Option<Arc<dyn QueueStatusReporter>>,
    ) -> Arc<Self> {
        Arc::new(Self { sender, reporter })
    }
}
