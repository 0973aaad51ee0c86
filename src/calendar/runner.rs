use std::{process::Stdio, time::Duration};

use async_trait::async_trait;
use tokio::{io::AsyncWriteExt, process::Command, time::timeout};
use tracing::debug;

use crate::config::ScriptConfig;
use crate::error::{CalendarError, CalendarResult};

/// Executes one generated automation script and returns its trimmed stdout.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    async fn run(&self, script: &str) -> CalendarResult<String>;
}

/// Runs scripts through an interpreter reading the script from stdin
/// (`osascript` by default).
#[derive(Debug, Clone)]
pub struct Osascript {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl Osascript {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &ScriptConfig) -> Self {
        Self::new(
            config.command.clone(),
            config.args.clone(),
            Duration::from_millis(config.timeout_ms),
        )
    }

    async fn run_to_completion(&self, script: &str) -> CalendarResult<std::process::Output> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CalendarError::Backend(format!("Failed to run {}: {e}", self.command)))?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(script.as_bytes()).await {
                // The interpreter may exit without reading; its status tells why.
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => {
                    return Err(CalendarError::Backend(format!("Failed to send script: {e}")));
                }
                _ => {}
            }
        }

        child
            .wait_with_output()
            .await
            .map_err(|e| CalendarError::Backend(format!("Failed to run {}: {e}", self.command)))
    }
}

#[async_trait]
impl ScriptRunner for Osascript {
    async fn run(&self, script: &str) -> CalendarResult<String> {
        debug!(command = %self.command, bytes = script.len(), "Running automation script");

        let output = match timeout(self.timeout, self.run_to_completion(script)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(CalendarError::Backend(format!(
                    "{} timed out after {}ms",
                    self.command,
                    self.timeout.as_millis()
                )))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CalendarError::Backend(format!(
                "Script failed ({}): {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
    }
}
