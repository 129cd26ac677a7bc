/// External collaborators and infrastructure services
pub mod config;
pub mod smtp;
pub mod status;

// Re-export service traits
pub use smtp::{EmailSender, SmtpEmailSender};
pub use status::{QueueStatusReporter, SupabaseStatusReporter};

#[cfg(any(test, feature = "test-utils"))]
pub use smtp::MockEmailSender;
#[cfg(any(test, feature = "test-utils"))]
pub use status::MockQueueStatusReporter;
