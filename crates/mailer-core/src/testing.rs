/// Scripted SMTP peer for tests
///
/// Listens on a loopback port, accepts a single connection and answers every
/// command with a canned reply unless told otherwise. Everything the client
/// sends is recorded.
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// How the peer reacts to commands
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Positive reply at every step
    AcceptAll,
    /// Never answer the command starting with this prefix
    SilentOn(&'static str),
    /// Answer the command starting with this prefix with a raw reply line
    Reject(&'static str, &'static str),
}

#[derive(Debug, Default)]
struct Transcript {
    commands: Vec<String>,
    message: Option<String>,
    closed: bool,
}

pub struct MockSmtpServer {
    port: u16,
    transcript: Arc<Mutex<Transcript>>,
    closed: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl MockSmtpServer {
    pub async fn start(behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock SMTP server");
        let port = listener.local_addr().expect("local addr").port();
        let transcript = Arc::new(Mutex::new(Transcript::default()));
        let closed = Arc::new(Notify::new());

        let handle = tokio::spawn(serve(
            listener,
            behavior,
            Arc::clone(&transcript),
            Arc::clone(&closed),
        ));

        Self {
            port,
            transcript,
            closed,
            handle,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Command lines received, without CRLF
    pub fn commands(&self) -> Vec<String> {
        self.transcript.lock().unwrap().commands.clone()
    }

    /// Command verbs received, e.g. `["EHLO", "AUTH", "MAIL", ...]`
    pub fn verbs(&self) -> Vec<String> {
        self.commands()
            .iter()
            .map(|c| c.split([' ', ':']).next().unwrap_or_default().to_string())
            .collect()
    }

    /// Raw DATA content up to (not including) the terminator line
    pub fn message(&self) -> Option<String> {
        self.transcript.lock().unwrap().message.clone()
    }

    /// True once the client closed its side of the connection
    pub fn client_closed(&self) -> bool {
        self.transcript.lock().unwrap().closed
    }

    /// Waits until the client closes the connection
    pub async fn wait_closed(&self) {
        loop {
            let notified = self.closed.notified();
            if self.client_closed() {
                return;
            }
            notified.await;
        }
    }
}

impl Drop for MockSmtpServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(
    listener: TcpListener,
    behavior: Behavior,
    transcript: Arc<Mutex<Transcript>>,
    closed: Arc<Notify>,
) {
    let Ok((socket, _)) = listener.accept().await else {
        return;
    };
    let (read_half, mut write_half) = socket.into_split();
    let mut reader = BufReader::new(read_half);

    let _ = write_half.write_all(b"220 mock.smtp ESMTP ready\r\n").await;

    let mut in_data = false;
    let mut data = String::new();

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        if in_data {
            if line == ".\r\n" {
                in_data = false;
                transcript.lock().unwrap().message = Some(std::mem::take(&mut data));
                let _ = write_half.write_all(b"250 2.0.0 OK queued\r\n").await;
            } else {
                data.push_str(&line);
            }
            continue;
        }

        let command = line.trim_end().to_string();
        transcript.lock().unwrap().commands.push(command.clone());

        let reply = match &behavior {
            Behavior::SilentOn(prefix) if command.starts_with(prefix) => continue,
            Behavior::Reject(prefix, reply) if command.starts_with(prefix) => {
                format!("{}\r\n", reply)
            }
            _ => default_reply(&command).to_string(),
        };

        if command.starts_with("DATA") && reply.starts_with('3') {
            in_data = true;
        }
        let _ = write_half.write_all(reply.as_bytes()).await;
    }

    transcript.lock().unwrap().closed = true;
    closed.notify_waiters();
}

fn default_reply(command: &str) -> &'static str {
    let verb = command.split([' ', ':']).next().unwrap_or_default();
    match verb.to_ascii_uppercase().as_str() {
        "EHLO" => "250-mock.smtp greets you\r\n250-SIZE 35882577\r\n250-AUTH LOGIN PLAIN\r\n250 SMTPUTF8\r\n",
        "AUTH" => "235 2.7.0 Accepted\r\n",
        "MAIL" | "RCPT" => "250 2.1.0 OK\r\n",
        "DATA" => "354 Go ahead\r\n",
        "QUIT" => "221 2.0.0 closing connection\r\n",
        _ => "502 5.5.1 Unrecognized command\r\n",
    }
}
