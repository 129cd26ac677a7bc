/// Utility modules
pub mod logging;

pub use logging::{extract_domain, redact_body, redact_email};
