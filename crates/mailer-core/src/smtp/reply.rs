/// SMTP reply parsing
use crate::error::MailerError;

/// One complete server reply, possibly spanning several `NNN-` lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl SmtpReply {
    /// Parses a raw reply such as `250-smtp.example.com\r\n250 OK\r\n`
    pub fn parse(raw: &str) -> Result<Self, MailerError> {
        let mut code = None;
        let mut lines = Vec::new();

        for line in raw.lines().map(|l| l.trim_end_matches('\r')) {
            if line.is_empty() {
                continue;
            }

            let line_code = parse_code(line)?;
            match code {
                None => code = Some(line_code),
                Some(c) if c != line_code => {
                    return Err(MailerError::Protocol(format!(
                        "Inconsistent reply codes {} and {}",
                        c, line_code
                    )));
                }
                Some(_) => {}
            }

            lines.push(line.get(4..).unwrap_or_default().to_string());
        }

        let code = code.ok_or_else(|| MailerError::Protocol("Empty reply".to_string()))?;
        Ok(Self { code, lines })
    }

    /// 2xx: positive completion
    pub fn is_positive(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// 3xx: positive intermediate, server waits for more input
    pub fn is_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }

    pub fn text(&self) -> String {
        self.lines.join(" ")
    }
}

/// Returns true for the final line of a reply (`NNN<SP>text` or bare `NNN`)
pub fn is_last_line(line: &str) -> bool {
    let line = line.trim_end_matches(['\r', '\n']);
    match line.as_bytes().get(3) {
        None => line.len() == 3,
        Some(b) => *b == b' ',
    }
}

fn parse_code(line: &str) -> Result<u16, MailerError> {
    let invalid = || MailerError::Protocol(format!("Malformed reply line: {:?}", line));

    let digits = line.get(..3).ok_or_else(invalid)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    match line.as_bytes().get(3) {
        None | Some(b' ') | Some(b'-') => {}
        Some(_) => return Err(invalid()),
    }
    digits.parse().map_err(|_| invalid())
}
