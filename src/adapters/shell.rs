//! Shell-backed command execution.

use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;
use tokio::process::Command;

use crate::domain::errors::CommandError;
use crate::domain::ports::{CommandExecutor, CommandOutcome};

/// Executes the operator's test command through `sh -c`.
///
/// The start time is recorded immediately before the spawn so the
/// freshness guard can compare report mtimes against it. No internal
/// timeout is imposed; operators wrap the command (e.g. with `timeout(1)`)
/// when they need one.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellExecutor;

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn execute(&self, command: &str, cwd: &Path) -> Result<CommandOutcome, CommandError> {
        let started_at_ms = Utc::now().timestamp_millis();

        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(cwd)
            .output()
            .await
            .map_err(|source| CommandError { command: command.to_string(), source })?;

        Ok(CommandOutcome {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            started_at_ms,
        })
    }
}
