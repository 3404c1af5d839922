//! # mailhook-imap
//!
//! The IMAP side of mailhook: connect, authenticate, watch a folder with
//! IDLE (RFC 2177) and fetch message envelopes.
//!
//! The wire protocol is handled by `async-imap`. This crate adds the parts
//! a long-running watcher needs on top of it:
//!
//! - **Security modes**: plaintext, STARTTLS upgrade and implicit TLS
//! - **Certificate policy**: required, optional (warn and continue) or off,
//!   with an extra CA bundle and an optional hostname check
//! - **IDLE batching**: updates that arrive together are returned together
//! - **Owned envelopes**: raw header bytes detached from the response buffer
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailhook_imap::{Security, ServerConfig, Session};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> mailhook_imap::Result<()> {
//!     let config = ServerConfig::builder("imap.example.com")
//!         .port(993)
//!         .security(Security::Implicit)
//!         .credentials("user@example.com", "password")
//!         .build();
//!
//!     let mut session = Session::open(&config, Some("INBOX"), true).await?;
//!     session.idle().await?;
//!     for status in session.wait(Duration::from_secs(60)).await? {
//!         println!("{status}");
//!     }
//!     session.logout().await
//! }
//! ```
//!
//! ## Modules
//!
//! - [`connection`]: Configuration, streams and the session wrapper
//! - [`types`]: Status updates, envelopes and folder counters

#![forbid(unsafe_code)]

pub mod connection;
mod error;
pub mod types;

pub use connection::{
    CertificateCheck, Credentials, ImapStream, Security, ServerConfig, ServerConfigBuilder,
    Session,
};
pub use error::{Error, ErrorKind, Result};
pub use types::{MailboxStatus, RawAddress, RawEnvelope, ServerStatus, StatusKind};
