//! Mock collaborators for exercising the control loop without a network
//! or a real test runner.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::domain::errors::{CommandError, ModelError};
use crate::domain::models::{Prompt, ValidationOutcome};
use crate::domain::ports::{
    CommandExecutor, CommandOutcome, ModelClient, ModelCompletion, ReportSink,
};

/// Scripted reply for one model invocation.
#[derive(Debug, Clone)]
pub struct MockModelResponse {
    pub text: String,
    pub fail: bool,
}

impl MockModelResponse {
    pub fn success(text: impl Into<String>) -> Self {
        Self { text: text.into(), fail: false }
    }

    pub fn failure() -> Self {
        Self { text: String::new(), fail: true }
    }
}

/// `ModelClient` that replays scripted responses and records every prompt
/// it receives. Once the script is exhausted the default response (empty
/// text, i.e. zero candidates) is returned.
pub struct MockModelClient {
    responses: Mutex<VecDeque<MockModelResponse>>,
    prompts: Mutex<Vec<Prompt>>,
}

impl MockModelClient {
    pub fn new() -> Self {
        Self::with_responses(Vec::new())
    }

    pub fn with_responses(responses: Vec<MockModelResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, in call order.
    pub async fn recorded_prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().await.clone()
    }
}

impl Default for MockModelClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn invoke(
        &self,
        prompt: &Prompt,
        _max_tokens: u32,
    ) -> Result<ModelCompletion, ModelError> {
        self.prompts.lock().await.push(prompt.clone());

        let response = self
            .responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| MockModelResponse::success(""));

        if response.fail {
            return Err(ModelError::Transport("mock transport failure".to_string()));
        }
        Ok(ModelCompletion { text: response.text, prompt_tokens: 100, completion_tokens: 50 })
    }
}

/// Scripted outcome for one command execution.
#[derive(Debug, Clone)]
pub struct MockRun {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Written to the executor's report path before returning, imitating
    /// the external tool regenerating the report. `None` leaves the report
    /// untouched (and therefore missing or stale).
    pub report_content: Option<String>,
}

impl MockRun {
    /// A run that exits 0 and regenerates the report.
    pub fn passing(report: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: "tests passed".to_string(),
            stderr: String::new(),
            report_content: Some(report.into()),
        }
    }

    /// A run that exits non-zero without touching the report.
    pub fn failing(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
            report_content: None,
        }
    }
}

/// `CommandExecutor` that replays scripted runs and refreshes the report
/// file the way the real test command would.
pub struct MockExecutor {
    report_path: PathBuf,
    script: Mutex<VecDeque<MockRun>>,
    default_run: MockRun,
    commands: Mutex<Vec<String>>,
}

impl MockExecutor {
    /// Executor that answers every call with `default_run`.
    pub fn new(report_path: impl Into<PathBuf>, default_run: MockRun) -> Self {
        Self {
            report_path: report_path.into(),
            script: Mutex::new(VecDeque::new()),
            default_run,
            commands: Mutex::new(Vec::new()),
        }
    }

    /// Executor that consumes `script` in order, then falls back to
    /// `default_run`.
    pub fn with_script(
        report_path: impl Into<PathBuf>,
        script: Vec<MockRun>,
        default_run: MockRun,
    ) -> Self {
        Self {
            report_path: report_path.into(),
            script: Mutex::new(script.into()),
            default_run,
            commands: Mutex::new(Vec::new()),
        }
    }

    /// Number of executions so far.
    pub async fn call_count(&self) -> usize {
        self.commands.lock().await.len()
    }
}

#[async_trait]
impl CommandExecutor for MockExecutor {
    async fn execute(&self, command: &str, _cwd: &Path) -> Result<CommandOutcome, CommandError> {
        let started_at_ms = Utc::now().timestamp_millis();
        self.commands.lock().await.push(command.to_string());

        let run = self
            .script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| self.default_run.clone());

        if let Some(content) = run.report_content {
            // The regenerated report must land strictly after the recorded
            // start time for the freshness guard to accept it.
            tokio::time::sleep(Duration::from_millis(20)).await;
            tokio::fs::write(&self.report_path, content)
                .await
                .map_err(|source| CommandError { command: command.to_string(), source })?;
        }

        Ok(CommandOutcome {
            exit_code: run.exit_code,
            stdout: run.stdout,
            stderr: run.stderr,
            started_at_ms,
        })
    }
}

/// `ReportSink` that captures every write it is asked to perform.
pub struct MockReportSink {
    writes: Mutex<Vec<Vec<ValidationOutcome>>>,
}

impl MockReportSink {
    pub fn new() -> Self {
        Self { writes: Mutex::new(Vec::new()) }
    }

    pub async fn write_count(&self) -> usize {
        self.writes.lock().await.len()
    }

    /// Outcomes from the most recent write, if any.
    pub async fn last_outcomes(&self) -> Option<Vec<ValidationOutcome>> {
        self.writes.lock().await.last().cloned()
    }
}

impl Default for MockReportSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReportSink for MockReportSink {
    async fn write(&self, outcomes: &[ValidationOutcome], _path: &Path) -> std::io::Result<()> {
        self.writes.lock().await.push(outcomes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_model_replays_script_then_default() {
        let client = MockModelClient::with_responses(vec![
            MockModelResponse::success("first"),
            MockModelResponse::success("second"),
        ]);
        let prompt = Prompt { system: "s".into(), user: "u".into() };

        assert_eq!(client.invoke(&prompt, 64).await.unwrap().text, "first");
        assert_eq!(client.invoke(&prompt, 64).await.unwrap().text, "second");
        assert_eq!(client.invoke(&prompt, 64).await.unwrap().text, "");
        assert_eq!(client.recorded_prompts().await.len(), 3);
    }

    #[tokio::test]
    async fn test_mock_model_failure() {
        let client = MockModelClient::with_responses(vec![MockModelResponse::failure()]);
        let prompt = Prompt::default();
        let err = client.invoke(&prompt, 64).await.unwrap_err();
        assert!(matches!(err, ModelError::Transport(_)));
    }

    #[tokio::test]
    async fn test_mock_executor_refreshes_report() {
        let dir = tempfile::tempdir().unwrap();
        let report_path = dir.path().join("coverage.xml");
        let executor = MockExecutor::new(&report_path, MockRun::passing("<coverage/>"));

        let outcome = executor.execute("make test", dir.path()).await.unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(executor.call_count().await, 1);

        crate::coverage::verify_report_update(&report_path, outcome.started_at_ms)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_mock_executor_failing_run_leaves_report_missing() {
        let dir = tempfile::tempdir().unwrap();
        let report_path = dir.path().join("coverage.xml");
        let executor = MockExecutor::new(&report_path, MockRun::failing(2, "compile error"));

        let outcome = executor.execute("make test", dir.path()).await.unwrap();
        assert_eq!(outcome.exit_code, 2);
        assert!(!report_path.exists());
    }

    #[tokio::test]
    async fn test_mock_sink_counts_writes() {
        let sink = MockReportSink::new();
        let outcomes = vec![ValidationOutcome::pass(0, "", "", "t")];
        sink.write(&outcomes, Path::new("unused.html")).await.unwrap();
        assert_eq!(sink.write_count().await, 1);
        assert_eq!(sink.last_outcomes().await.unwrap().len(), 1);
    }
}
