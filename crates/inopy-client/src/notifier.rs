//! Desktop notifications.

use std::io::Write;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{ClientError, Result};

/// Application name shown by the notification daemon.
pub const APP_NAME: &str = "Inopy";

/// Display time in milliseconds.
pub const EXPIRE_MS: u32 = 5000;

/// Delivers a summary/body pair to the user.
#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    async fn notify(&self, summary: &str, body: &str) -> Result<()>;
}

/// Sends through `notify-send` (libnotify).
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    program: String,
    icon: String,
}

impl DesktopNotifier {
    pub fn new(icon: impl Into<String>) -> Self {
        Self {
            program: "notify-send".to_string(),
            icon: icon.into(),
        }
    }

    /// Use a different executable with the same command line.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn args(&self, summary: &str, body: &str) -> Vec<String> {
        let mut args = vec![
            "--app-name".to_string(),
            APP_NAME.to_string(),
            "--expire-time".to_string(),
            EXPIRE_MS.to_string(),
        ];
        if !self.icon.is_empty() {
            args.push("--icon".to_string());
            args.push(self.icon.clone());
        }
        args.push(summary.to_string());
        args.push(body.to_string());
        args
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn notify(&self, summary: &str, body: &str) -> Result<()> {
        let status = Command::new(&self.program)
            .args(self.args(summary, body))
            .status()
            .await
            .map_err(|e| ClientError::Notify(format!("{}: {e}", self.program)))?;

        if !status.success() {
            return Err(ClientError::Notify(format!("{} exited with {status}", self.program)));
        }
        tracing::debug!(summary, "Notification sent");
        Ok(())
    }
}

/// Prints the notification instead of showing it.
#[derive(Debug, Default, Clone)]
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, summary: &str, body: &str) -> Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{summary}")
            .and_then(|_| write!(out, "{body}"))
            .and_then(|_| out.flush())
            .map_err(|e| ClientError::Notify(e.to_string()))
    }
}
