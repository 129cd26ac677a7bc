/// Application constants
///
/// This module contains all hardcoded values used throughout the application.
/// Constants are organized by category for easy maintenance.
// ============================================================================
// SMTP Defaults
// ============================================================================
/// Default SMTP relay host
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";

/// Default SMTP port (implicit TLS / SMTPS)
pub const DEFAULT_SMTP_PORT: u16 = 465;

/// Default timeout for connecting and for each SMTP reply, in seconds
pub const DEFAULT_SMTP_TIMEOUT_SECS: u64 = 10;

/// Default argument for the EHLO command
pub const DEFAULT_EHLO_NAME: &str = "localhost";

/// Default display name used in the From header and signature
pub const DEFAULT_SENDER_NAME: &str = "Notifications";

/// Maximum length of a single SMTP reply line; RFC 5321 sets 512, servers often exceed it
pub const MAX_REPLY_LINE_LENGTH: usize = 4096;

// ============================================================================
// Webhook Payload
// ============================================================================

/// Operation type emitted by the database trigger for new rows
pub const WEBHOOK_INSERT_TYPE: &str = "INSERT";

/// Table whose inserts trigger an email
pub const WEBHOOK_QUEUE_TABLE: &str = "user_email_queue";

// ============================================================================
// Queue Collaborator
// ============================================================================

/// Remote procedure that marks a queued email as sent or failed
pub const MARK_EMAIL_SENT_RPC: &str = "mark_email_sent";

/// Path prefix of PostgREST remote procedure calls
pub const RPC_PATH_PREFIX: &str = "rest/v1/rpc";

// ============================================================================
// Message Template
// ============================================================================

/// Subject of the welcome email
pub const EMAIL_SUBJECT: &str = "Thank you for your interest!";

// ============================================================================
// Environment Variables
// ============================================================================

pub const ENV_SMTP_USER: &str = "GMAIL_USER";
pub const ENV_SMTP_PASSWORD: &str = "GMAIL_APP_PASSWORD";
pub const ENV_SENDER_NAME: &str = "SENDER_NAME";
pub const ENV_SMTP_HOST: &str = "SMTP_HOST";
pub const ENV_SMTP_PORT: &str = "SMTP_PORT";
pub const ENV_SMTP_TLS: &str = "SMTP_TLS";
pub const ENV_SMTP_TIMEOUT_SECS: &str = "SMTP_TIMEOUT_SECS";
pub const ENV_SMTP_EHLO_NAME: &str = "SMTP_EHLO_NAME";
pub const ENV_SUPABASE_URL: &str = "SUPABASE_URL";
pub const ENV_SUPABASE_SERVICE_ROLE_KEY: &str = "SUPABASE_SERVICE_ROLE_KEY";
