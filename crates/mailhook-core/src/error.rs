//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// IMAP operation failed.
    #[error("IMAP error: {0}")]
    Imap(#[from] mailhook_imap::Error),

    /// Configuration file is not valid TOML.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration is well-formed but invalid. Holds every problem found.
    #[error("Configuration error: {}", .0.join("; "))]
    Config(Vec<String>),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
