//! External command execution port.

use async_trait::async_trait;
use std::path::Path;

use crate::domain::errors::CommandError;

/// Captured result of one external command run.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// Process exit status; -1 when the process was killed by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Wall-clock milliseconds recorded immediately before the spawn. The
    /// freshness guard compares report mtimes against this.
    pub started_at_ms: i64,
}

/// Capability for running the operator's build/test command.
///
/// The control loop never spawns processes directly, so it can be driven
/// by a fake in tests.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `command` through the shell in `cwd`, capturing output and
    /// start time. A non-zero exit status is a normal outcome, not an
    /// error; only a failure to launch at all is.
    async fn execute(&self, command: &str, cwd: &Path) -> Result<CommandOutcome, CommandError>;
}
