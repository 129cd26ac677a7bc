/// Configuration service - loads config from environment variables
use crate::constants::*;
use crate::error::MailerError;
use crate::models::{MailerConfig, SmtpConfig, SmtpSecurity, StatusReportConfig};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Loads the configuration from the process environment
pub fn load_from_env() -> Result<MailerConfig, MailerError> {
    load_with(|key| std::env::var(key).ok())
}

/// Loads the configuration through an arbitrary variable lookup
///
/// Missing SMTP credentials are not an error here: sending fails per request
/// instead. Malformed numeric or boolean values are rejected.
pub fn load_with<F>(lookup: F) -> Result<MailerConfig, MailerError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let port = parse_var(&var, ENV_SMTP_PORT)?.unwrap_or(DEFAULT_SMTP_PORT);
    let timeout_secs =
        parse_var(&var, ENV_SMTP_TIMEOUT_SECS)?.unwrap_or(DEFAULT_SMTP_TIMEOUT_SECS);
    let security = match var(ENV_SMTP_TLS) {
        None => SmtpSecurity::ImplicitTls,
        Some(value) => parse_tls_flag(&value)?,
    };

    let smtp = SmtpConfig {
        host: var(ENV_SMTP_HOST).unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
        port,
        security,
        timeout: Duration::from_secs(timeout_secs),
        ehlo_name: var(ENV_SMTP_EHLO_NAME).unwrap_or_else(|| DEFAULT_EHLO_NAME.to_string()),
        username: var(ENV_SMTP_USER),
        password: var(ENV_SMTP_PASSWORD),
        sender_name: var(ENV_SENDER_NAME).unwrap_or_else(|| DEFAULT_SENDER_NAME.to_string()),
    };

    let status = match (var(ENV_SUPABASE_URL), var(ENV_SUPABASE_SERVICE_ROLE_KEY)) {
        (Some(url), Some(service_key)) => {
            let base_url = Url::parse(&url).map_err(|e| {
                MailerError::Config(format!("Invalid {} '{}': {}", ENV_SUPABASE_URL, url, e))
            })?;
            Some(StatusReportConfig {
                base_url,
                service_key,
            })
        }
        _ => None,
    };

    let config = MailerConfig { smtp, status };

    config
        .validate()
        .map_err(|e| MailerError::Config(format!("Invalid configuration: {}", e)))?;

    if config.smtp.credentials().is_err() {
        tracing::warn!("SMTP credentials not configured; every send will fail");
    }

    tracing::info!(
        smtp = %config.smtp.address(),
        status_reporting = config.status.is_some(),
        "Configuration validated successfully"
    );

    Ok(config)
}

fn parse_var<T, F>(var: &F, key: &str) -> Result<Option<T>, MailerError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| MailerError::Config(format!("Invalid {} '{}': {}", key, raw, e)))
        })
        .transpose()
}

fn parse_tls_flag(value: &str) -> Result<SmtpSecurity, MailerError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(SmtpSecurity::ImplicitTls),
        "0" | "false" | "no" | "off" => Ok(SmtpSecurity::Plain),
        other => Err(MailerError::Config(format!(
            "Invalid {} '{}': expected true or false",
            ENV_SMTP_TLS, other
        ))),
    }
}
