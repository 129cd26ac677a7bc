/// Connection setup for the SMTP client
use crate::error::MailerError;
use crate::models::{SmtpConfig, SmtpSecurity};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::{self, RootCertStore, pki_types::ServerName};
use tracing::debug;

/// Any bidirectional byte stream the session can drive
pub trait SmtpStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> SmtpStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

pub type BoxedStream = Box<dyn SmtpStream>;

/// Opens a connection to the configured SMTP server
///
/// TCP connect and TLS handshake are each bounded by the configured timeout.
pub async fn connect(config: &SmtpConfig) -> Result<BoxedStream, MailerError> {
    let addr = config.address();
    debug!(addr = %addr, security = ?config.security, "Connecting to SMTP server");

    let tcp = tokio::time::timeout(config.timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| MailerError::Connection(format!("Connection timed out: {}", addr)))?
        .map_err(|e| MailerError::Connection(format!("Failed to connect to {}: {}", addr, e)))?;

    match config.security {
        SmtpSecurity::Plain => Ok(Box::new(tcp)),
        SmtpSecurity::ImplicitTls => {
            let connector = tls_connector()?;
            let server_name = ServerName::try_from(config.host.clone())
                .map_err(|e| MailerError::Tls(format!("Invalid server name: {}", e)))?;

            let tls = tokio::time::timeout(config.timeout, connector.connect(server_name, tcp))
                .await
                .map_err(|_| MailerError::Tls(format!("TLS handshake timed out: {}", addr)))?
                .map_err(|e| MailerError::Tls(format!("TLS handshake failed: {}", e)))?;

            debug!(addr = %addr, "TLS connection established");
            Ok(Box::new(tls))
        }
    }
}

fn tls_connector() -> Result<TlsConnector, MailerError> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| MailerError::Tls(format!("Failed to build TLS config: {}", e)))?
    .with_root_certificates(roots)
    .with_no_client_auth();

    Ok(TlsConnector::from(Arc::new(config)))
}
