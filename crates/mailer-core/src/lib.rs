/// Mailer Core - Shared library for the send-email notification function
///
/// This crate contains the request classifier, the SMTP client, the queue
/// status reporter and the configuration used by the Lambda HTTP function.
pub mod constants;
pub mod email;
pub mod error;
pub mod models;
pub mod services;
pub mod smtp;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export commonly used types
pub use error::MailerError;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
