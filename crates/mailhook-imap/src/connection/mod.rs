//! IMAP connection management.
//!
//! This module provides connection handling for IMAP servers, including:
//! - Configuration (host, port, security mode, certificate policy)
//! - TLS/plaintext stream abstraction with STARTTLS upgrade
//! - An authenticated session with IDLE support

mod config;
mod idle;
mod session;
mod stream;
mod tls;

pub use config::{
    CertificateCheck, Credentials, Security, ServerConfig, ServerConfigBuilder, UnknownMode,
};
pub use idle::{MAX_POLL_TIMEOUT, SETTLE_WINDOW};
pub use session::Session;
pub use stream::{ImapStream, connect};
pub use tls::create_tls_connector;
