//! Configuration file loading.
//!
//! The file is TOML with an optional `[watcher]` table and one
//! `[accounts.<name>]` table per watched account:
//!
//! ```toml
//! [watcher]
//! max_errors = 0
//! error_backoff_secs = 60
//! reconnect_after_secs = 600
//! poll_timeout_secs = 15
//!
//! [accounts.work]
//! host = "imap.example.com"
//! port = 993
//! username = "me@example.com"
//! password = "secret"
//! encryption = "ssl"
//! on_new_message = "notify-send \"$MESSAGE_SUBJECT\""
//! env_topic = "work"
//! ```
//!
//! Unknown keys are logged and ignored. Every problem in the accounts is
//! collected so one run reports them all.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use mailhook_imap::{CertificateCheck, Security, ServerConfig};
use serde::Deserialize;
use tracing::warn;

use crate::account::{AccountConfig, DEFAULT_FOLDER, validate_account, validate_settings};
use crate::settings::WatcherSettings;
use crate::{Error, Result};

/// Prefix of keys forwarded to the new-message command.
const ENV_PREFIX: &str = "env_";

/// Fully loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Watcher tuning.
    pub watcher: WatcherSettings,
    /// Accounts in file order.
    pub accounts: Vec<AccountConfig>,
}

impl AppConfig {
    /// Returns `<config dir>/mailhook/config.toml`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mailhook")
            .join("config.toml")
    }

    /// Reads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, [`Error::Toml`] if
    /// it is not valid TOML and [`Error::Config`] listing every invalid
    /// setting otherwise.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        text.parse()
    }
}

impl FromStr for AppConfig {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(text)?;
        for key in raw.extra.keys() {
            warn!(key = %key, "ignoring unknown top-level key");
        }

        let mut problems = Vec::new();

        let watcher = raw.watcher.unwrap_or_default().into_settings();
        if let Err(errors) = validate_settings(&watcher) {
            problems.extend(errors.iter().map(|e| format!("watcher.{}: {e}", e.field())));
        }

        let mut accounts = Vec::new();
        for (name, value) in raw.accounts.unwrap_or_default() {
            match parse_account(&name, value) {
                Ok(account) => match validate_account(&account) {
                    Ok(()) => accounts.push(account),
                    Err(errors) => problems.extend(
                        errors
                            .iter()
                            .map(|e| format!("accounts.{name}.{}: {e}", e.field())),
                    ),
                },
                Err(mut errors) => problems.append(&mut errors),
            }
        }

        if problems.is_empty() {
            Ok(Self { watcher, accounts })
        } else {
            Err(Error::Config(problems))
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    watcher: Option<RawWatcher>,
    accounts: Option<toml::Table>,
    #[serde(flatten)]
    extra: toml::Table,
}

#[derive(Debug, Default, Deserialize)]
struct RawWatcher {
    max_errors: Option<u32>,
    error_backoff_secs: Option<u64>,
    reconnect_after_secs: Option<u64>,
    poll_timeout_secs: Option<u64>,
    #[serde(flatten)]
    extra: toml::Table,
}

impl RawWatcher {
    fn into_settings(self) -> WatcherSettings {
        for key in self.extra.keys() {
            warn!(key = %key, "ignoring unknown watcher key");
        }

        let defaults = WatcherSettings::default();
        WatcherSettings {
            max_errors: self.max_errors.unwrap_or(defaults.max_errors),
            error_backoff: self
                .error_backoff_secs
                .map_or(defaults.error_backoff, Duration::from_secs),
            reconnect_after: self
                .reconnect_after_secs
                .map_or(defaults.reconnect_after, Duration::from_secs),
            poll_timeout: self
                .poll_timeout_secs
                .map_or(defaults.poll_timeout, Duration::from_secs),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    host: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    encryption: Option<String>,
    encryption_hostname_check: Option<bool>,
    encryption_certificate_check: Option<String>,
    encryption_certificate_ca_file: Option<PathBuf>,
    folder: Option<String>,
    on_new_message: Option<String>,
    #[serde(flatten)]
    extra: toml::Table,
}

/// Converts one `[accounts.<name>]` table.
fn parse_account(name: &str, value: toml::Value) -> std::result::Result<AccountConfig, Vec<String>> {
    let raw: RawAccount = value
        .try_into()
        .map_err(|e: toml::de::Error| vec![format!("accounts.{name}: {}", e.message())])?;

    let mut problems = Vec::new();

    let security = raw
        .encryption
        .as_deref()
        .map_or(Ok(Security::default()), Security::from_str)
        .unwrap_or_else(|e| {
            problems.push(format!(
                "accounts.{name}.encryption: unknown mode {:?} (expected none, ssl or starttls)",
                e.0
            ));
            Security::default()
        });
    let certificate_check = raw
        .encryption_certificate_check
        .as_deref()
        .map_or(Ok(CertificateCheck::default()), CertificateCheck::from_str)
        .unwrap_or_else(|e| {
            problems.push(format!(
                "accounts.{name}.encryption_certificate_check: unknown mode {:?} \
                 (expected none, optional or required)",
                e.0
            ));
            CertificateCheck::default()
        });

    let mut builder = ServerConfig::builder(trimmed(raw.host).unwrap_or_default())
        .port(raw.port.unwrap_or(ServerConfig::DEFAULT_PORT))
        .security(security)
        .certificate_check(certificate_check)
        .hostname_check(raw.encryption_hostname_check.unwrap_or(true));
    // A blank username means no login, which validation then rejects.
    if let Some(username) = trimmed(raw.username).filter(|u| !u.is_empty()) {
        let password = trimmed(raw.password).unwrap_or_default();
        builder = builder.credentials(username, password);
    }
    if let Some(ca_file) = raw.encryption_certificate_ca_file {
        builder = builder.ca_file(ca_file);
    }

    let mut env = BTreeMap::new();
    for (key, value) in raw.extra {
        let Some(var) = env_name(&key) else {
            warn!(account = name, key = %key, "ignoring unknown account key");
            continue;
        };
        match scalar(&value) {
            Some(text) => {
                env.insert(var.trim().to_uppercase(), text);
            }
            None => problems.push(format!(
                "accounts.{name}.{key}: expected a scalar value, found {}",
                value.type_str()
            )),
        }
    }

    if !problems.is_empty() {
        return Err(problems);
    }

    Ok(AccountConfig {
        name: name.to_string(),
        server: builder.build(),
        folder: raw
            .folder
            .map_or_else(|| DEFAULT_FOLDER.to_string(), |f| f.trim().to_string()),
        on_new_message: trimmed(raw.on_new_message).filter(|c| !c.is_empty()),
        env,
    })
}

/// Strips the `env_` prefix, in any letter case.
fn env_name(key: &str) -> Option<&str> {
    let prefix = key.get(..ENV_PREFIX.len())?;
    if prefix.eq_ignore_ascii_case(ENV_PREFIX) {
        key.get(ENV_PREFIX.len()..)
    } else {
        None
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

/// Renders a scalar TOML value as environment text.
fn scalar(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.trim().to_string()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Datetime(d) => Some(d.to_string()),
        toml::Value::Array(_) | toml::Value::Table(_) => None,
    }
}
