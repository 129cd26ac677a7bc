/// Welcome email composition using the lettre message builder
use crate::constants::EMAIL_SUBJECT;
use crate::error::MailerError;
use crate::models::EmailRequest;
use lettre::Message;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;

/// Builds the formatted RFC 5322 welcome message for one recipient
pub fn compose_welcome(
    sender_name: &str,
    sender_address: &str,
    request: &EmailRequest,
) -> Result<Vec<u8>, MailerError> {
    let from = Mailbox::new(
        Some(sender_name.to_string()),
        sender_address
            .parse()
            .map_err(|e| MailerError::Compose(format!("Invalid sender address: {}", e)))?,
    );
    let to = Mailbox::new(
        None,
        request
            .email
            .parse()
            .map_err(|e| MailerError::Compose(format!("Invalid recipient address: {}", e)))?,
    );

    let message = Message::builder()
        .from(from)
        .to(to)
        .subject(EMAIL_SUBJECT)
        .header(ContentType::TEXT_PLAIN)
        .body(welcome_body(&request.name, sender_name))
        .map_err(|e| MailerError::Compose(format!("Failed to build email: {}", e)))?;

    Ok(message.formatted())
}

/// Plaintext body of the welcome email
pub fn welcome_body(recipient_name: &str, sender_name: &str) -> String {
    format!(
        "\
Welcome to Our Platform!

Hi {recipient_name},

Thank you for reaching out and expressing interest in connecting with me!

I hope the PersonaGPT gave you a clear and helpful introduction to my background, skills, and the kind of work I’m passionate about.

If you have any follow-up questions, want to explore opportunities to collaborate, or simply want to continue the conversation, feel free to reply to this email.

I’d love to hear from you!

Best regards,
{sender_name}
"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> EmailRequest {
        EmailRequest {
            name: "Ana".to_string(),
            email: "ana@x.com".to_string(),
            id: None,
        }
    }

    #[test]
    fn test_welcome_body() {
        let body = welcome_body("Ana", "Jane Doe");
        assert!(body.starts_with("Welcome to Our Platform!"));
        assert!(body.contains("Hi Ana,"));
        assert!(body.contains("I hope the PersonaGPT gave you a clear and helpful introduction"));
        assert!(body.contains("the kind of work I’m passionate about."));
        assert!(body.contains("I’d love to hear from you!"));
        assert!(body.trim_end().ends_with("Best regards,\nJane Doe"));
    }

    #[test]
    fn test_compose_headers_and_body() {
        let raw = compose_welcome("Jane Doe", "sender@example.com", &request()).unwrap();
        let text = String::from_utf8(raw).unwrap();

        let (headers, body) = text.split_once("\r\n\r\n").expect("header/body separator");
        assert!(headers.contains("From: \"Jane Doe\" <sender@example.com>")
            || headers.contains("From: Jane Doe <sender@example.com>"));
        assert!(headers.contains("To: ana@x.com"));
        assert!(headers.contains("Subject: Thank you for your interest!"));
        assert!(headers.to_ascii_lowercase().contains("content-type: text/plain"));
        assert!(
            headers
                .to_ascii_lowercase()
                .contains("content-transfer-encoding: quoted-printable")
        );
        assert!(body.contains("Hi Ana,"));
    }

    #[test]
    fn test_compose_rejects_invalid_addresses() {
        let err = compose_welcome("Jane", "not-an-address", &request()).unwrap_err();
        assert!(matches!(err, MailerError::Compose(_)));

        let mut bad = request();
        bad.email = "nobody".to_string();
        assert!(compose_welcome("Jane", "sender@example.com", &bad).is_err());
    }
}
