//! `mailhook` - run a command whenever mail arrives.
//!
//! Keeps one IMAP IDLE session per configured account and runs the
//! account's `on_new_message` command for every new message.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mailhook_core::{AccountConfig, AppConfig, ImapTransport, ProbeReport, Supervisor, probe};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watch every account until interrupted (default).
    Watch {
        /// Configuration file.
        #[arg(env = "MAILHOOK_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Connect to every account once and show its newest message.
    Check {
        /// Configuration file.
        #[arg(env = "MAILHOOK_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailhook=info,mailhook_core=info,mailhook_imap=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Watch { config: None }) {
        Command::Watch { config } => watch(&load(config)?).await,
        Command::Check { config } => check(&load(config)?).await,
    }
}

fn load(path: Option<PathBuf>) -> Result<AppConfig> {
    let path = path.unwrap_or_else(AppConfig::default_path);
    info!(path = %path.display(), "loading configuration");
    AppConfig::load(&path).with_context(|| config_context(&path))
}

fn config_context(path: &Path) -> String {
    format!("failed to load configuration from {}", path.display())
}

async fn watch(config: &AppConfig) -> Result<ExitCode> {
    if config.accounts.is_empty() {
        warn!("no accounts configured, nothing to watch");
        return Ok(ExitCode::SUCCESS);
    }

    let mut supervisor = Supervisor::new(ImapTransport, config.watcher);
    for account in &config.accounts {
        supervisor.spawn(account.clone());
    }

    let reports = supervisor.run(shutdown_signal()).await;
    let stopped_on_errors = reports.iter().filter(|r| r.consecutive_errors > 0).count();
    info!(
        watchers = reports.len(),
        stopped_on_errors, "all watchers finished"
    );
    Ok(ExitCode::SUCCESS)
}

async fn check(config: &AppConfig) -> Result<ExitCode> {
    if config.accounts.is_empty() {
        warn!("no accounts configured, nothing to check");
        return Ok(ExitCode::SUCCESS);
    }

    let mut failed = 0_usize;
    for account in &config.accounts {
        match probe(account).await {
            Ok(report) => print_report(account, &report),
            Err(err) => {
                failed += 1;
                error!(account = %account.name, kind = %err.kind(), error = %err, "check failed");
                println!("[{}] FAILED ({}): {err}", account.name, err.kind());
            }
        }
    }

    if failed == 0 {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn print_report(account: &AccountConfig, report: &ProbeReport) {
    println!(
        "[{}] OK {}:{} {}",
        report.account, account.server.host, account.server.port, account.folder
    );
    println!("  capabilities: {}", report.capabilities.join(" "));
    if !report.supports_idle() {
        println!("  warning: server does not announce IDLE");
    }
    if let Some(mailbox) = &report.mailbox {
        println!("  messages: {} ({} recent)", mailbox.exists, mailbox.recent);
    }

    let Some(latest) = &report.latest else {
        println!("  latest: none");
        return;
    };
    let summary = &latest.summary;
    let show = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
    println!("  latest: #{}", latest.number);
    println!("    date:    {}", show(summary.date.map(|d| d.to_rfc2822())));
    println!("    subject: {}", show(summary.subject.clone()));
    println!(
        "    from:    {}",
        show(summary.from_first().map(ToString::to_string))
    );
    println!(
        "    sender:  {}",
        show(summary.sender_first().map(ToString::to_string))
    );
}

/// Completes on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(err) => {
                error!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("interrupted"),
        () = terminate => info!("terminated"),
    }
}
