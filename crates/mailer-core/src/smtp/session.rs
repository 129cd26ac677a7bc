/// SMTP dialogue as an explicit state machine
///
/// Each state has one fallible transition that writes at most one command,
/// reads exactly one reply and checks its code before advancing.
use crate::constants::MAX_REPLY_LINE_LENGTH;
use crate::error::MailerError;
use crate::models::Credentials;
use crate::smtp::reply::{SmtpReply, is_last_line};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpState {
    Greeting,
    Ehlo,
    Auth,
    MailFrom,
    RcptTo,
    Data,
    Message,
    Quit,
    Closed,
}

impl SmtpState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Ehlo => "EHLO",
            Self::Auth => "AUTH",
            Self::MailFrom => "MAIL FROM",
            Self::RcptTo => "RCPT TO",
            Self::Data => "DATA",
            Self::Message => "message",
            Self::Quit => "QUIT",
            Self::Closed => "closed",
        }
    }

    fn next(self) -> Self {
        match self {
            Self::Greeting => Self::Ehlo,
            Self::Ehlo => Self::Auth,
            Self::Auth => Self::MailFrom,
            Self::MailFrom => Self::RcptTo,
            Self::RcptTo => Self::Data,
            Self::Data => Self::Message,
            Self::Message => Self::Quit,
            Self::Quit | Self::Closed => Self::Closed,
        }
    }
}

impl fmt::Display for SmtpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything one delivery needs
#[derive(Clone, Copy)]
pub struct Envelope<'a> {
    pub credentials: Credentials<'a>,
    pub from: &'a str,
    pub to: &'a str,
    /// Formatted RFC 5322 message (headers, blank line, body)
    pub message: &'a [u8],
}

pub struct SmtpSession<S> {
    stream: BufReader<S>,
    state: SmtpState,
    timeout: Duration,
    ehlo_name: String,
}

impl<S> SmtpSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, ehlo_name: impl Into<String>, timeout: Duration) -> Self {
        Self {
            stream: BufReader::new(stream),
            state: SmtpState::Greeting,
            timeout,
            ehlo_name: ehlo_name.into(),
        }
    }

    pub fn state(&self) -> SmtpState {
        self.state
    }

    /// Drives the dialogue from the current state until the session is closed
    pub async fn run(&mut self, envelope: &Envelope<'_>) -> Result<(), MailerError> {
        while self.state != SmtpState::Closed {
            self.step(envelope).await?;
        }
        Ok(())
    }

    /// Executes the transition out of the current state
    ///
    /// On failure the session stays in the state that failed.
    pub async fn step(&mut self, envelope: &Envelope<'_>) -> Result<SmtpState, MailerError> {
        match self.state {
            SmtpState::Greeting => self.greeting().await?,
            SmtpState::Ehlo => self.ehlo().await?,
            SmtpState::Auth => self.auth_plain(envelope.credentials).await?,
            SmtpState::MailFrom => self.mail_from(envelope.from).await?,
            SmtpState::RcptTo => self.rcpt_to(envelope.to).await?,
            SmtpState::Data => self.data().await?,
            SmtpState::Message => self.message(envelope.message).await?,
            SmtpState::Quit => self.quit().await?,
            SmtpState::Closed => return Ok(SmtpState::Closed),
        }

        self.state = self.state.next();
        Ok(self.state)
    }

    /// Shuts the stream down; call on every exit path
    pub async fn close(mut self) -> Result<(), MailerError> {
        let timeout = self.timeout;
        bounded(timeout, self.stream.get_mut().shutdown()).await?;
        debug!("SMTP connection closed");
        Ok(())
    }

    async fn greeting(&mut self) -> Result<(), MailerError> {
        let reply = self.read_reply().await?;
        self.expect_positive(&reply)
    }

    async fn ehlo(&mut self) -> Result<(), MailerError> {
        let command = format!("EHLO {}", self.ehlo_name);
        let reply = self.command(&command).await?;
        self.expect_positive(&reply)
    }

    async fn auth_plain(&mut self, credentials: Credentials<'_>) -> Result<(), MailerError> {
        let token = STANDARD.encode(format!(
            "\0{}\0{}",
            credentials.username, credentials.password
        ));
        let reply = self.command(&format!("AUTH PLAIN {}", token)).await?;
        self.expect_positive(&reply)
    }

    async fn mail_from(&mut self, from: &str) -> Result<(), MailerError> {
        let reply = self.command(&format!("MAIL FROM:<{}>", from)).await?;
        self.expect_positive(&reply)
    }

    async fn rcpt_to(&mut self, to: &str) -> Result<(), MailerError> {
        let reply = self.command(&format!("RCPT TO:<{}>", to)).await?;
        self.expect_positive(&reply)
    }

    async fn data(&mut self) -> Result<(), MailerError> {
        let reply = self.command("DATA").await?;
        if reply.is_intermediate() {
            Ok(())
        } else {
            Err(self.rejected(&reply))
        }
    }

    async fn message(&mut self, message: &[u8]) -> Result<(), MailerError> {
        debug!(bytes = message.len(), "Sending message content");
        let mut payload = encode_data(message);
        payload.extend_from_slice(b".\r\n");
        self.write(&payload).await?;

        let reply = self.read_reply().await?;
        self.expect_positive(&reply)
    }

    async fn quit(&mut self) -> Result<(), MailerError> {
        let reply = self.command("QUIT").await?;
        // The message is already accepted at this point
        if !reply.is_positive() {
            warn!(code = reply.code, text = %reply.text(), "QUIT not acknowledged");
        }
        Ok(())
    }

    fn expect_positive(&self, reply: &SmtpReply) -> Result<(), MailerError> {
        if reply.is_positive() {
            Ok(())
        } else {
            Err(self.rejected(reply))
        }
    }

    fn rejected(&self, reply: &SmtpReply) -> MailerError {
        MailerError::SmtpRejected {
            stage: self.state.name().to_string(),
            code: reply.code,
            message: reply.text(),
        }
    }

    /// Sends one CRLF-terminated command and reads its reply
    async fn command(&mut self, command: &str) -> Result<SmtpReply, MailerError> {
        if command.starts_with("AUTH PLAIN") {
            debug!("C: AUTH PLAIN ***");
        } else {
            debug!("C: {}", command);
        }
        self.write(format!("{}\r\n", command).as_bytes()).await?;
        self.read_reply().await
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), MailerError> {
        let timeout = self.timeout;
        let stream = self.stream.get_mut();
        bounded(timeout, stream.write_all(bytes)).await?;
        bounded(timeout, stream.flush()).await
    }

    /// Reads one complete reply; the timeout covers all of its lines
    async fn read_reply(&mut self) -> Result<SmtpReply, MailerError> {
        let timeout = self.timeout;
        let raw = tokio::time::timeout(timeout, read_reply_lines(&mut self.stream))
            .await
            .map_err(|_| MailerError::Timeout(timeout))??;

        for line in raw.lines() {
            debug!("S: {}", line);
        }
        SmtpReply::parse(&raw)
    }
}

async fn read_reply_lines<R>(reader: &mut R) -> Result<String, MailerError>
where
    R: AsyncBufRead + Unpin,
{
    let mut raw = String::new();
    loop {
        let mut line = Vec::new();
        let n = (&mut *reader)
            .take(MAX_REPLY_LINE_LENGTH as u64)
            .read_until(b'\n', &mut line)
            .await?;

        if n == 0 {
            return Err(MailerError::ConnectionClosed);
        }
        if !line.ends_with(b"\n") && n == MAX_REPLY_LINE_LENGTH {
            return Err(MailerError::Protocol("Reply line too long".to_string()));
        }

        let line = String::from_utf8_lossy(&line);
        raw.push_str(&line);
        if is_last_line(&line) {
            return Ok(raw);
        }
    }
}

async fn bounded<F>(timeout: Duration, io: F) -> Result<(), MailerError>
where
    F: Future<Output = std::io::Result<()>>,
{
    tokio::time::timeout(timeout, io)
        .await
        .map_err(|_| MailerError::Timeout(timeout))?
        .map_err(MailerError::from)
}

/// Prepares message content for the DATA phase
///
/// Normalises line endings to CRLF, doubles leading dots and guarantees a
/// trailing CRLF so the terminator lands on its own line.
pub fn encode_data(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + 64);
    let mut at_line_start = true;
    let mut prev = 0u8;

    for &byte in message {
        if at_line_start && byte == b'.' {
            out.push(b'.');
        }
        if byte == b'\n' && prev != b'\r' {
            out.push(b'\r');
        }
        out.push(byte);
        at_line_start = byte == b'\n';
        prev = byte;
    }

    if !out.ends_with(b"\r\n") {
        out.extend_from_slice(b"\r\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncWriteExt, DuplexStream, duplex};

    const CREDS: Credentials<'static> = Credentials {
        username: "sender@example.com",
        password: "secret",
    };

    fn envelope() -> Envelope<'static> {
        Envelope {
            credentials: CREDS,
            from: "sender@example.com",
            to: "ana@x.com",
            message: b"Subject: Hi\r\n\r\nHello\r\n",
        }
    }

    fn session(timeout: Duration) -> (SmtpSession<DuplexStream>, BufReader<DuplexStream>) {
        let (client, server) = duplex(8192);
        (
            SmtpSession::new(client, "localhost", timeout),
            BufReader::new(server),
        )
    }

    async fn next_line(server: &mut BufReader<DuplexStream>) -> String {
        let mut line = String::new();
        server.read_line(&mut line).await.unwrap();
        line
    }

    #[tokio::test]
    async fn test_full_exchange_bytes() {
        let auth = format!(
            "AUTH PLAIN {}\r\n",
            STANDARD.encode("\0sender@example.com\0secret")
        );
        let stream = tokio_test::io::Builder::new()
            .read(b"220 smtp.example.com ESMTP\r\n")
            .write(b"EHLO localhost\r\n")
            .read(b"250-smtp.example.com\r\n250 AUTH PLAIN LOGIN\r\n")
            .write(auth.as_bytes())
            .read(b"235 2.7.0 Accepted\r\n")
            .write(b"MAIL FROM:<sender@example.com>\r\n")
            .read(b"250 OK\r\n")
            .write(b"RCPT TO:<ana@x.com>\r\n")
            .read(b"250 OK\r\n")
            .write(b"DATA\r\n")
            .read(b"354 Go ahead\r\n")
            .write(b"Subject: Hi\r\n\r\nHello\r\n.\r\n")
            .read(b"250 queued\r\n")
            .write(b"QUIT\r\n")
            .read(b"221 bye\r\n")
            .build();

        let mut session = SmtpSession::new(stream, "localhost", Duration::from_secs(1));
        session.run(&envelope()).await.unwrap();
        assert_eq!(session.state(), SmtpState::Closed);
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_greeting_then_ehlo() {
        let (mut session, mut server) = session(Duration::from_secs(1));
        server.get_mut().write_all(b"220 ready\r\n").await.unwrap();

        assert_eq!(session.step(&envelope()).await.unwrap(), SmtpState::Ehlo);

        server
            .get_mut()
            .write_all(b"250-smtp.example.com\r\n250-AUTH PLAIN\r\n250 OK\r\n")
            .await
            .unwrap();
        assert_eq!(session.step(&envelope()).await.unwrap(), SmtpState::Auth);
        assert_eq!(next_line(&mut server).await, "EHLO localhost\r\n");
    }

    #[tokio::test]
    async fn test_auth_plain_encoding() {
        let (mut session, mut server) = session(Duration::from_secs(1));
        session.state = SmtpState::Auth;
        server.get_mut().write_all(b"235 2.7.0 Accepted\r\n").await.unwrap();

        session.step(&envelope()).await.unwrap();

        let line = next_line(&mut server).await;
        let token = line
            .trim_end()
            .strip_prefix("AUTH PLAIN ")
            .expect("AUTH PLAIN command");
        let decoded = STANDARD.decode(token).unwrap();
        assert_eq!(decoded, b"\0sender@example.com\0secret");
        assert_eq!(session.state(), SmtpState::MailFrom);
    }

    #[tokio::test]
    async fn test_rejected_rcpt() {
        let (mut session, mut server) = session(Duration::from_secs(1));
        session.state = SmtpState::RcptTo;
        server
            .get_mut()
            .write_all(b"550 5.1.1 No such user\r\n")
            .await
            .unwrap();

        let err = session.step(&envelope()).await.unwrap_err();
        match err {
            MailerError::SmtpRejected { stage, code, .. } => {
                assert_eq!(stage, "RCPT TO");
                assert_eq!(code, 550);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(session.state(), SmtpState::RcptTo);
        assert_eq!(next_line(&mut server).await, "RCPT TO:<ana@x.com>\r\n");
    }

    #[tokio::test]
    async fn test_data_requires_intermediate_reply() {
        let (mut session, mut server) = session(Duration::from_secs(1));
        session.state = SmtpState::Data;
        server.get_mut().write_all(b"250 OK\r\n").await.unwrap();

        let err = session.step(&envelope()).await.unwrap_err();
        assert!(matches!(err, MailerError::SmtpRejected { code: 250, .. }));
    }

    #[tokio::test]
    async fn test_message_is_terminated() {
        let (mut session, mut server) = session(Duration::from_secs(1));
        session.state = SmtpState::Message;
        server.get_mut().write_all(b"250 2.0.0 queued\r\n").await.unwrap();

        assert_eq!(session.step(&envelope()).await.unwrap(), SmtpState::Quit);

        assert_eq!(next_line(&mut server).await, "Subject: Hi\r\n");
        assert_eq!(next_line(&mut server).await, "\r\n");
        assert_eq!(next_line(&mut server).await, "Hello\r\n");
        assert_eq!(next_line(&mut server).await, ".\r\n");
    }

    #[tokio::test]
    async fn test_quit_rejection_is_tolerated() {
        let (mut session, mut server) = session(Duration::from_secs(1));
        session.state = SmtpState::Quit;
        server.get_mut().write_all(b"500 what\r\n").await.unwrap();

        assert_eq!(session.step(&envelope()).await.unwrap(), SmtpState::Closed);
        assert_eq!(session.step(&envelope()).await.unwrap(), SmtpState::Closed);
    }

    #[tokio::test]
    async fn test_read_timeout() {
        let (mut session, _server) = session(Duration::from_millis(50));

        let err = session.step(&envelope()).await.unwrap_err();
        assert!(matches!(err, MailerError::Timeout(_)));
        assert_eq!(session.state(), SmtpState::Greeting);
    }

    #[tokio::test]
    async fn test_connection_closed() {
        let (mut session, server) = session(Duration::from_secs(1));
        drop(server);

        let err = session.step(&envelope()).await.unwrap_err();
        assert!(matches!(err, MailerError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_close_shuts_down_stream() {
        let (session, mut server) = session(Duration::from_secs(1));
        session.close().await.unwrap();

        let mut buf = Vec::new();
        let n = server.read_to_end(&mut buf).await.unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn test_encode_data() {
        assert_eq!(encode_data(b"a\r\nb"), b"a\r\nb\r\n");
        assert_eq!(encode_data(b"a\nb\n"), b"a\r\nb\r\n");
        assert_eq!(encode_data(b".hidden\r\n..two\r\n"), b"..hidden\r\n...two\r\n");
        assert_eq!(encode_data(b"line\r\n.\r\n"), b"line\r\n..\r\n");
        assert_eq!(encode_data(b"a.b\r\n"), b"a.b\r\n");
    }

    #[test]
    fn test_state_order() {
        let mut state = SmtpState::Greeting;
        let mut seen = vec![state];
        while state != SmtpState::Closed {
            state = state.next();
            seen.push(state);
        }
        assert_eq!(
            seen,
            vec![
                SmtpState::Greeting,
                SmtpState::Ehlo,
                SmtpState::Auth,
                SmtpState::MailFrom,
                SmtpState::RcptTo,
                SmtpState::Data,
                SmtpState::Message,
                SmtpState::Quit,
                SmtpState::Closed,
            ]
        );
    }
}
