//! # mailhook-core
//!
//! Watches IMAP folders and runs a command for every new message.
//!
//! This crate provides:
//! - Account and watcher configuration (TOML)
//! - Envelope summaries built from raw IMAP envelopes
//! - The per-account watcher state machine
//! - A supervisor running one watcher task per account
//! - New-message callbacks that run a shell command

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
pub mod callback;
pub mod config;
pub mod envelope;
mod error;
pub mod service;
pub mod settings;
pub mod supervisor;
pub mod transport;
pub mod watcher;

pub use account::{
    AccountConfig, DEFAULT_FOLDER, ValidationError, ValidationResult, validate_account,
    validate_settings,
};
pub use callback::{
    ActionError, CallbackContext, CallbackDispatcher, DispatchError, MessageHandler,
};
pub use config::AppConfig;
pub use envelope::{Address, EnvelopeSummary, summarize};
pub use error::{Error, Result};
pub use service::{LatestMessage, ProbeReport, probe};
pub use settings::WatcherSettings;
pub use supervisor::Supervisor;
pub use transport::{ImapTransport, NotifySession, Transport};
pub use watcher::{AccountWatcher, Phase, WatcherReport, detect_new_message};
