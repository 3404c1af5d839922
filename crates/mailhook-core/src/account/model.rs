//! Account model types.

use std::collections::BTreeMap;

use mailhook_imap::ServerConfig;

/// Folder watched when none is configured.
pub const DEFAULT_FOLDER: &str = "INBOX";

/// One watched mailbox account.
///
/// Loaded once at startup and shared read-only with its watcher.
#[derive(Debug, Clone)]
pub struct AccountConfig {
    /// Account name (the configuration section name).
    pub name: String,
    /// Connection settings.
    pub server: ServerConfig,
    /// Folder to watch.
    pub folder: String,
    /// Shell command run for each new message.
    pub on_new_message: Option<String>,
    /// Extra environment entries passed to the command.
    pub env: BTreeMap<String, String>,
}

impl AccountConfig {
    /// Creates an account watching [`DEFAULT_FOLDER`] without a command.
    #[must_use]
    pub fn new(name: impl Into<String>, server: ServerConfig) -> Self {
        Self {
            name: name.into(),
            server,
            folder: DEFAULT_FOLDER.to_string(),
            on_new_message: None,
            env: BTreeMap::new(),
        }
    }

    /// Sets the watched folder.
    #[must_use]
    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    /// Sets the new-message command.
    #[must_use]
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.on_new_message = Some(command.into());
        self
    }

    /// Adds an extra environment entry.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_inbox() {
        let account = AccountConfig::new("work", ServerConfig::new("imap.example.com"));
        assert_eq!(account.name, "work");
        assert_eq!(account.folder, "INBOX");
        assert!(account.on_new_message.is_none());
        assert!(account.env.is_empty());
    }

    #[test]
    fn builders() {
        let account = AccountConfig::new("work", ServerConfig::new("imap.example.com"))
            .with_folder("Archive")
            .with_command("notify-send hi")
            .with_env("TOPIC", "mail");
        assert_eq!(account.folder, "Archive");
        assert_eq!(account.on_new_message.as_deref(), Some("notify-send hi"));
        assert_eq!(account.env.get("TOPIC").unwrap(), "mail");
    }
}
