//! New-message callbacks.
//!
//! A [`CallbackDispatcher`] turns an [`EnvelopeSummary`] into environment
//! variables and runs the account's shell command with them in a detached
//! task. The command sees only these variables:
//!
//! | Variable | Value |
//! |----------|-------|
//! | `MESSAGE_ID` | `Message-ID` header |
//! | `MESSAGE_REPLY_TO_ID` | `In-Reply-To` header |
//! | `MESSAGE_DATE` | `YYYY-MM-DD HH:MM:SS+HH:MM` |
//! | `MESSAGE_SUBJECT` | `Subject` header |
//! | `MESSAGE_AUTHOR*` | first `From`, else first `Sender` |
//! | `MESSAGE_FROM*`, `MESSAGE_SENDER*`, `MESSAGE_TO*` | first address of each list |
//!
//! Each address appears three times: the composite form (`Name <a@b>`),
//! `_NAME` and `_MAIL`. Missing values are empty strings. The account's
//! `env_*` entries are added as well, but never replace these keys.

use std::collections::BTreeMap;
use std::process::ExitStatus;
use std::sync::Arc;

use thiserror::Error;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::account::AccountConfig;
use crate::envelope::{Address, EnvelopeSummary};

/// Keys that every context defines.
pub const CONTEXT_KEYS: [&str; 16] = [
    "MESSAGE_ID",
    "MESSAGE_REPLY_TO_ID",
    "MESSAGE_DATE",
    "MESSAGE_SUBJECT",
    "MESSAGE_AUTHOR",
    "MESSAGE_AUTHOR_NAME",
    "MESSAGE_AUTHOR_MAIL",
    "MESSAGE_FROM",
    "MESSAGE_FROM_NAME",
    "MESSAGE_FROM_MAIL",
    "MESSAGE_SENDER",
    "MESSAGE_SENDER_NAME",
    "MESSAGE_SENDER_MAIL",
    "MESSAGE_TO",
    "MESSAGE_TO_NAME",
    "MESSAGE_TO_MAIL",
];

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

/// Why a callback could not be started.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The account has no `on_new_message` command.
    #[error("no command configured for new messages")]
    NoActionConfigured,
}

/// Why a started callback failed.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The shell could not be started.
    #[error("failed to launch {command:?}: {source}")]
    Launch {
        /// Configured command.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The command ran but did not succeed.
    #[error("{command:?} exited with {status}")]
    ExitStatus {
        /// Configured command.
        command: String,
        /// Exit status of the shell.
        status: ExitStatus,
    },
}

/// Environment handed to the new-message command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackContext {
    vars: BTreeMap<String, String>,
}

impl CallbackContext {
    /// Builds the context for one message.
    ///
    /// `extra` entries are applied first so derived keys win on conflict.
    #[must_use]
    pub fn build(summary: &EnvelopeSummary, extra: &BTreeMap<String, String>) -> Self {
        let mut vars = extra.clone();
        let mut set = |key: &str, value: Option<String>| {
            vars.insert(key.to_string(), value.unwrap_or_default());
        };

        set("MESSAGE_ID", summary.message_id.clone());
        set("MESSAGE_REPLY_TO_ID", summary.in_reply_to.clone());
        set(
            "MESSAGE_DATE",
            summary.date.map(|date| date.format(DATE_FORMAT).to_string()),
        );
        set("MESSAGE_SUBJECT", summary.subject.clone());

        for (prefix, address) in [
            ("MESSAGE_AUTHOR", summary.author()),
            ("MESSAGE_FROM", summary.from_first()),
            ("MESSAGE_SENDER", summary.sender_first()),
            ("MESSAGE_TO", summary.to_first()),
        ] {
            set(prefix, address.map(Address::to_string));
            set(
                format!("{prefix}_NAME").as_str(),
                address.and_then(Address::name).map(str::to_string),
            );
            set(format!("{prefix}_MAIL").as_str(), address.and_then(Address::mail));
        }

        Self { vars }
    }

    /// Returns the value of one variable.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Iterates over all variables in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns true if there are no variables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Receives the summaries of new messages.
///
/// Implementations must return quickly; the watcher calls this between
/// two polls.
pub trait MessageHandler: Send + Sync + 'static {
    /// Handles one new message.
    ///
    /// # Errors
    ///
    /// Returns an error if the message could not be handed off. The watcher
    /// logs it and carries on.
    fn on_new_message(&self, summary: &EnvelopeSummary) -> Result<(), DispatchError>;
}

/// Runs an account's shell command for new messages.
#[derive(Debug, Clone)]
pub struct CallbackDispatcher {
    account: String,
    command: Option<String>,
    env: BTreeMap<String, String>,
}

impl CallbackDispatcher {
    /// Creates a dispatcher for the account's command and extra environment.
    #[must_use]
    pub fn new(account: &AccountConfig) -> Self {
        Self {
            account: account.name.clone(),
            command: account.on_new_message.clone(),
            env: account.env.clone(),
        }
    }

    /// Starts the command for one message in a detached task.
    ///
    /// The task logs its own outcome; the returned handle can be dropped.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::NoActionConfigured`] without doing any work
    /// if the account has no command.
    pub fn dispatch(
        &self,
        summary: &EnvelopeSummary,
    ) -> Result<JoinHandle<Result<ExitStatus, ActionError>>, DispatchError> {
        let Some(command) = self.command.clone() else {
            return Err(DispatchError::NoActionConfigured);
        };
        let context = CallbackContext::build(summary, &self.env);
        let account = self.account.clone();

        Ok(tokio::spawn(async move {
            info!(account = %account, command = %command, "running new-message command");
            let result = run(&command, &context).await;
            if let Err(err) = &result {
                error!(account = %account, error = %err, "new-message command failed");
            }
            result
        }))
    }
}

impl MessageHandler for CallbackDispatcher {
    fn on_new_message(&self, summary: &EnvelopeSummary) -> Result<(), DispatchError> {
        self.dispatch(summary).map(drop)
    }
}

impl<H: MessageHandler> MessageHandler for Arc<H> {
    fn on_new_message(&self, summary: &EnvelopeSummary) -> Result<(), DispatchError> {
        (**self).on_new_message(summary)
    }
}

async fn run(command: &str, context: &CallbackContext) -> Result<ExitStatus, ActionError> {
    let status = shell(command)
        .env_clear()
        .envs(context.iter())
        .status()
        .await
        .map_err(|source| ActionError::Launch {
            command: command.to_string(),
            source,
        })?;

    if status.success() {
        Ok(status)
    } else {
        Err(ActionError::ExitStatus {
            command: command.to_string(),
            status,
        })
    }
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut shell = Command::new("cmd");
    shell.arg("/C").arg(command);
    shell
}

#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    let mut shell = Command::new("/bin/sh");
    shell.arg("-c").arg(command);
    shell
}
