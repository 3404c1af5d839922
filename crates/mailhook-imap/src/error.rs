//! Error types for the IMAP transport.

use thiserror::Error;

/// Broad classification of a transport failure.
///
/// Every variant of [`Error`] maps onto exactly one kind so callers can log
/// the right diagnosis without matching on library details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// TCP connection could not be established.
    Connection,
    /// TLS handshake, STARTTLS upgrade or trust policy failure.
    Tls,
    /// Login was rejected or could not be attempted.
    Auth,
    /// Folder selection failed.
    Folder,
    /// Entering, waiting in or leaving IDLE failed.
    Notify,
    /// Fetching message metadata failed.
    Fetch,
    /// Any other protocol exchange failed.
    Protocol,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Connection => "connection",
            Self::Tls => "tls",
            Self::Auth => "auth",
            Self::Folder => "folder",
            Self::Notify => "notify",
            Self::Fetch => "fetch",
            Self::Protocol => "protocol",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during IMAP operations.
#[derive(Debug, Error)]
pub enum Error {
    /// TCP connect failed or timed out.
    #[error("connection to {address} failed: {source}")]
    Connection {
        /// `host:port` that was dialed.
        address: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// TLS handshake failed.
    #[error("TLS handshake failed: {0}")]
    Tls(#[source] std::io::Error),

    /// The server refused the STARTTLS upgrade.
    #[error("STARTTLS upgrade rejected: {0}")]
    StartTls(#[source] async_imap::error::Error),

    /// The trust store could not be built (unreadable or empty CA bundle).
    #[error("certificate setup failed: {0}")]
    Certificate(String),

    /// Invalid DNS name for TLS.
    #[error("invalid server name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Server rejected the login.
    #[error("login failed: {0}")]
    Auth(#[source] async_imap::error::Error),

    /// No credentials are configured; the client cannot reach the
    /// authenticated state without them.
    #[error("no username configured")]
    MissingCredentials,

    /// Folder selection failed.
    #[error("selecting folder {folder:?} failed: {source}")]
    Folder {
        /// Folder that was requested.
        folder: String,
        /// Underlying protocol error.
        #[source]
        source: async_imap::error::Error,
    },

    /// IDLE could not be entered, maintained or left.
    #[error("IDLE failed: {0}")]
    Notify(#[source] async_imap::error::Error),

    /// The session is not in the state the operation requires.
    #[error("invalid session state: {0}")]
    InvalidState(&'static str),

    /// Envelope fetch failed.
    #[error("fetch failed: {0}")]
    Fetch(#[source] async_imap::error::Error),

    /// Other protocol exchange failed.
    #[error("protocol error: {0}")]
    Protocol(#[source] async_imap::error::Error),
}

impl Error {
    /// Returns the failure classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Tls(_) | Self::StartTls(_) | Self::Certificate(_) | Self::InvalidDnsName(_) => {
                ErrorKind::Tls
            }
            Self::Auth(_) | Self::MissingCredentials => ErrorKind::Auth,
            Self::Folder { .. } => ErrorKind::Folder,
            Self::Notify(_) | Self::InvalidState(_) => ErrorKind::Notify,
            Self::Fetch(_) => ErrorKind::Fetch,
            Self::Protocol(_) => ErrorKind::Protocol,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
