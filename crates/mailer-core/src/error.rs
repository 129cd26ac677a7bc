/// Error types for the mailer
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("SMTP timeout after {0:?}")]
    Timeout(Duration),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("SMTP {stage} rejected with {code}: {message}")]
    SmtpRejected {
        stage: String,
        code: u16,
        message: String,
    },

    #[error("SMTP protocol error: {0}")]
    Protocol(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Email composition error: {0}")]
    Compose(String),

    #[error("Status report error: {0}")]
    StatusReport(String),
}

impl MailerError {
    /// Determines if an error happened while talking to the SMTP peer
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Self::Connection(_)
                | Self::Tls(_)
                | Self::Timeout(_)
                | Self::ConnectionClosed
                | Self::Io(_)
        )
    }
}

// Implement conversions for common error types
impl From<std::io::Error> for MailerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<reqwest::Error> for MailerError {
    fn from(err: reqwest::Error) -> Self {
        Self::StatusReport(err.to_string())
    }
}
