/// Data models for the mailer
pub mod config;
pub mod request;

// Re-export commonly used types
pub use config::*;
pub use request::*;
