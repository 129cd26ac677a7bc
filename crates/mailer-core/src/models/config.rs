/// Configuration models
use crate::constants::{
    DEFAULT_EHLO_NAME, DEFAULT_SENDER_NAME, DEFAULT_SMTP_HOST, DEFAULT_SMTP_PORT,
    DEFAULT_SMTP_TIMEOUT_SECS,
};
use crate::error::MailerError;
use std::fmt;
use std::time::Duration;
use typed_builder::TypedBuilder;
use url::Url;

/// Complete function configuration, loaded once at process start
#[derive(Debug, Clone)]
pub struct MailerConfig {
    pub smtp: SmtpConfig,
    /// Queue collaborator; `None` disables status reporting
    pub status: Option<StatusReportConfig>,
}

impl MailerConfig {
    /// Validates configuration is valid
    pub fn validate(&self) -> Result<(), String> {
        if self.smtp.host.trim().is_empty() {
            return Err("SMTP host not configured".to_string());
        }

        if self.smtp.port == 0 {
            return Err("SMTP port must be > 0".to_string());
        }

        if self.smtp.timeout.is_zero() {
            return Err("SMTP timeout must be > 0".to_string());
        }

        if self.smtp.ehlo_name.trim().is_empty() {
            return Err("EHLO name must not be empty".to_string());
        }

        if let Some(status) = &self.status {
            if status.service_key.is_empty() {
                return Err("Status report service key is empty".to_string());
            }
        }

        Ok(())
    }
}

/// How the SMTP connection is secured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// TLS from the first byte (SMTPS, port 465)
    #[default]
    ImplicitTls,
    /// No encryption; only for local relays and tests
    Plain,
}

#[derive(Clone, TypedBuilder)]
pub struct SmtpConfig {
    #[builder(default = DEFAULT_SMTP_HOST.to_string(), setter(into))]
    pub host: String,
    #[builder(default = DEFAULT_SMTP_PORT)]
    pub port: u16,
    #[builder(default)]
    pub security: SmtpSecurity,
    /// Bounds connecting and every reply read
    #[builder(default = Duration::from_secs(DEFAULT_SMTP_TIMEOUT_SECS))]
    pub timeout: Duration,
    #[builder(default = DEFAULT_EHLO_NAME.to_string(), setter(into))]
    pub ehlo_name: String,
    /// SMTP username, also used as the sender address
    #[builder(default, setter(strip_option, into))]
    pub username: Option<String>,
    #[builder(default, setter(strip_option, into))]
    pub password: Option<String>,
    #[builder(default = DEFAULT_SENDER_NAME.to_string(), setter(into))]
    pub sender_name: String,
}

/// Borrowed credential pair for AUTH PLAIN
#[derive(Clone, Copy)]
pub struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

impl SmtpConfig {
    /// Returns the credential pair, failing if either half is unset
    pub fn credentials(&self) -> Result<Credentials<'_>, MailerError> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Ok(Credentials { username, password })
            }
            _ => Err(MailerError::Config(
                "Gmail credentials not configured. Please set GMAIL_USER and GMAIL_APP_PASSWORD"
                    .to_string(),
            )),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("security", &self.security)
            .field("timeout", &self.timeout)
            .field("ehlo_name", &self.ehlo_name)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("sender_name", &self.sender_name)
            .finish()
    }
}

/// Queue collaborator endpoint and key
#[derive(Clone)]
pub struct StatusReportConfig {
    pub base_url: Url,
    pub service_key: String,
}

impl fmt::Debug for StatusReportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusReportConfig")
            .field("base_url", &self.base_url.as_str())
            .field("service_key", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MailerConfig {
        MailerConfig {
            smtp: SmtpConfig::builder()
                .username("sender@example.com")
                .password("app-password")
                .build(),
            status: None,
        }
    }

    #[test]
    fn test_smtp_defaults() {
        let smtp = SmtpConfig::builder().build();
        assert_eq!(smtp.host, "smtp.gmail.com");
        assert_eq!(smtp.port, 465);
        assert_eq!(smtp.security, SmtpSecurity::ImplicitTls);
        assert_eq!(smtp.timeout, Duration::from_secs(10));
        assert_eq!(smtp.ehlo_name, "localhost");
        assert_eq!(smtp.address(), "smtp.gmail.com:465");
    }

    #[test]
    fn test_credentials() {
        let smtp = config().smtp;
        let creds = smtp.credentials().unwrap();
        assert_eq!(creds.username, "sender@example.com");
        assert_eq!(creds.password, "app-password");
    }

    #[test]
    fn test_missing_credentials() {
        let smtp = SmtpConfig::builder().username("sender@example.com").build();
        let err = smtp.credentials().err().unwrap();
        assert!(matches!(err, MailerError::Config(_)));
        assert!(err.to_string().contains("GMAIL_APP_PASSWORD"));

        let smtp = SmtpConfig::builder().password("").username("").build();
        assert!(smtp.credentials().is_err());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let mut cfg = config();
        cfg.status = Some(StatusReportConfig {
            base_url: Url::parse("https://project.supabase.co").unwrap(),
            service_key: "service-secret".to_string(),
        });

        let debug = format!("{:?}", cfg);
        assert!(!debug.contains("app-password"));
        assert!(!debug.contains("service-secret"));
        assert!(debug.contains("sender@example.com"));
    }

    #[test]
    fn test_validate() {
        assert!(config().validate().is_ok());

        let mut invalid = config();
        invalid.smtp.port = 0;
        assert!(invalid.validate().is_err());

        let mut invalid = config();
        invalid.smtp.timeout = Duration::ZERO;
        assert!(invalid.validate().is_err());

        let mut invalid = config();
        invalid.smtp.host = " ".to_string();
        assert!(invalid.validate().is_err());
    }
}
