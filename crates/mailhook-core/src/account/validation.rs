//! Account validation.

use super::model::AccountConfig;
use crate::settings::WatcherSettings;

/// Validation error for account or watcher configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Account name is empty.
    EmptyName,
    /// IMAP host is empty.
    EmptyHost,
    /// IMAP port is zero.
    InvalidPort,
    /// Folder name is empty.
    EmptyFolder,
    /// No username is configured; sessions cannot log in.
    MissingUsername,
    /// An extra environment entry has no name after the `env_` prefix.
    EmptyEnvName,
    /// Poll bound is zero or not below the IDLE ceiling.
    InvalidPollTimeout,
}

impl ValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::EmptyName => "Account name is required",
            Self::EmptyHost => "IMAP host is required",
            Self::InvalidPort => "IMAP port must be 1-65535",
            Self::EmptyFolder => "Folder must not be empty",
            Self::MissingUsername => "Username is required",
            Self::EmptyEnvName => "Environment entry needs a name after env_",
            Self::InvalidPollTimeout => "Poll timeout must be between 1 second and 29 minutes",
        }
    }

    /// Get the configuration key this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyName => "name",
            Self::EmptyHost => "host",
            Self::InvalidPort => "port",
            Self::EmptyFolder => "folder",
            Self::MissingUsername => "username",
            Self::EmptyEnvName => "env_",
            Self::InvalidPollTimeout => "poll_timeout_secs",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ValidationError {}

/// Result of validating an account.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Validate an account configuration.
///
/// Returns `Ok(())` if valid, or `Err(Vec<ValidationError>)` with all errors.
///
/// # Errors
///
/// Returns a vector of `ValidationError` if any fields are invalid.
pub fn validate_account(account: &AccountConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if account.name.trim().is_empty() {
        errors.push(ValidationError::EmptyName);
    }
    if account.server.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    if account.server.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }
    if account.folder.trim().is_empty() {
        errors.push(ValidationError::EmptyFolder);
    }
    if account
        .server
        .credentials
        .as_ref()
        .is_none_or(|credentials| credentials.username.trim().is_empty())
    {
        errors.push(ValidationError::MissingUsername);
    }
    if account.env.keys().any(|key| key.trim().is_empty()) {
        errors.push(ValidationError::EmptyEnvName);
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Validate the watcher settings.
///
/// # Errors
///
/// Returns a vector of `ValidationError` if any setting is invalid.
pub fn validate_settings(settings: &WatcherSettings) -> ValidationResult {
    if settings.poll_timeout_valid() {
        Ok(())
    } else {
        Err(vec![ValidationError::InvalidPollTimeout])
    }
}
