//! Stream types for IMAP connections.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

use super::config::{Security, ServerConfig};
use super::tls::create_tls_connector;
use crate::{Error, Result};

/// A stream that can be either plaintext or TLS.
#[derive(Debug)]
pub enum ImapStream {
    /// Plaintext TCP stream.
    Plain(TcpStream),
    /// TLS-encrypted stream (boxed to reduce enum size).
    Tls(Box<TlsStream<TcpStream>>),
}

impl ImapStream {
    /// Returns true if the stream is TLS-encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }
}

impl AsyncRead for ImapStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for ImapStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Self::Tls(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Tls(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

/// Opens a stream according to the configured security mode.
///
/// For [`Security::StartTls`] the upgrade happens here, before any
/// credentials are sent.
pub async fn connect(config: &ServerConfig) -> Result<ImapStream> {
    let tcp = connect_tcp(config).await?;

    match config.security {
        Security::None => Ok(ImapStream::Plain(tcp)),
        Security::Implicit => handshake(config, tcp).await,
        Security::StartTls => {
            let mut client = async_imap::Client::new(tcp);
            client
                .run_command_and_check_ok("STARTTLS", None)
                .await
                .map_err(Error::StartTls)?;
            handshake(config, client.into_inner()).await
        }
    }
}

async fn connect_tcp(config: &ServerConfig) -> Result<TcpStream> {
    let address = config.address();
    let connect = TcpStream::connect((config.host.as_str(), config.port));

    match tokio::time::timeout(config.connect_timeout, connect).await {
        Ok(Ok(tcp)) => Ok(tcp),
        Ok(Err(source)) => Err(Error::Connection { address, source }),
        Err(_) => Err(Error::Connection {
            address,
            source: io::Error::new(
                io::ErrorKind::TimedOut,
                format!("no answer within {:?}", config.connect_timeout),
            ),
        }),
    }
}

async fn handshake(config: &ServerConfig, tcp: TcpStream) -> Result<ImapStream> {
    let connector = create_tls_connector(config)?;
    let server_name = ServerName::try_from(config.host.clone())?;
    let tls = connector
        .connect(server_name, tcp)
        .await
        .map_err(Error::Tls)?;

    tracing::debug!(host = %config.host, "TLS established");
    Ok(ImapStream::Tls(Box::new(tls)))
}
