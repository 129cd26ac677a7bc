/// Logging utilities for PII redaction
///
/// Recipient addresses come from untrusted callers and end up in structured
/// logs; these helpers keep only what is useful for debugging.
use regex::Regex;
use std::sync::LazyLock;

// Email redaction regex
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid email regex")
});

/// Redacts email addresses from text, preserving domain for debugging
///
/// # Examples
/// ```
/// use mailer_core::utils::logging::redact_email;
///
/// assert_eq!(redact_email("user@example.com"), "***@example.com");
/// assert_eq!(redact_email("Email sent to ana@x.com"), "Email sent to ***@x.com");
/// ```
pub fn redact_email(text: &str) -> String {
    EMAIL_PATTERN
        .replace_all(text, |caps: &regex::Captures| {
            let email = &caps[0];
            match email.find('@') {
                Some(at_pos) => format!("***{}", &email[at_pos..]),
                None => "***@***".to_string(),
            }
        })
        .to_string()
}

/// Redacts a JSON request body for logging (shows length only)
pub fn redact_body(body: &[u8]) -> String {
    format!("[{} bytes]", body.len())
}

/// Extracts domain from email address for safe logging
pub fn extract_domain(email: &str) -> &str {
    email.rsplit_once('@').map(|(_, d)| d).unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_email() {
        assert_eq!(redact_email("user@example.com"), "***@example.com");
        assert_eq!(
            redact_email("Contact test@acme.com for help"),
            "Contact ***@acme.com for help"
        );
        assert_eq!(
            redact_email("From: alice@foo.com To: bob@bar.com"),
            "From: ***@foo.com To: ***@bar.com"
        );
        assert_eq!(redact_email("no address here"), "no address here");
    }

    #[test]
    fn test_redact_body() {
        assert_eq!(redact_body(b"{\"name\":\"Ana\"}"), "[14 bytes]");
        assert_eq!(redact_body(b""), "[0 bytes]");
    }

    #[test]
    fn test_extract_domain() {
        assert_eq!(extract_domain("user@example.com"), "example.com");
        assert_eq!(extract_domain("invalid"), "unknown");
    }
}
