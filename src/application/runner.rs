//! Test-run coordination.
//!
//! Executes the operator's build/test command and reads the coverage
//! signal it regenerates, with the freshness guard separating the two.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::coverage::CoverageProcessor;
use crate::domain::errors::{CommandError, CoverageError};
use crate::domain::models::CoverageResult;
use crate::domain::ports::{CommandExecutor, CommandOutcome};

/// Either step of a measurement can fail: launching the command, or
/// interpreting the report it should have produced.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Coverage(#[from] CoverageError),
}

/// Runs the test command and measures the coverage report it produces.
///
/// The split `execute`/`measure` pair lets the caller attribute captured
/// output to a candidate even when measurement fails afterwards;
/// `run_and_measure` is the one-shot composition.
pub struct CoverageRunner {
    command: String,
    command_dir: PathBuf,
    processor: CoverageProcessor,
    executor: Arc<dyn CommandExecutor>,
}

impl CoverageRunner {
    pub fn new(
        command: impl Into<String>,
        command_dir: impl Into<PathBuf>,
        processor: CoverageProcessor,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        Self {
            command: command.into(),
            command_dir: command_dir.into(),
            processor,
            executor,
        }
    }

    /// Launch the test command and capture its outcome. A non-zero exit
    /// status is data for the caller, not an error.
    pub async fn execute(&self) -> Result<CommandOutcome, CommandError> {
        debug!(command = %self.command, cwd = %self.command_dir.display(), "running test command");
        self.executor.execute(&self.command, &self.command_dir).await
    }

    /// Read the report produced by a command that started at
    /// `started_at_ms`, enforcing freshness first.
    pub async fn measure(&self, started_at_ms: i64) -> Result<CoverageResult, CoverageError> {
        self.processor.process(started_at_ms).await
    }

    /// Run the command, then measure the report it regenerated.
    pub async fn run_and_measure(
        &self,
    ) -> Result<(CommandOutcome, CoverageResult), RunnerError> {
        let outcome = self.execute().await?;
        let coverage = self.measure(outcome.started_at_ms).await?;
        Ok((outcome, coverage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{MockExecutor, MockRun};

    const REPORT: &str = r#"<coverage>
  <package><class filename="app.py"><lines>
    <line number="1" hits="1"/>
    <line number="2" hits="0"/>
  </lines></class></package>
</coverage>"#;

    fn runner(dir: &std::path::Path, executor: Arc<MockExecutor>) -> CoverageRunner {
        let processor =
            CoverageProcessor::new(dir.join("coverage.xml"), "app.py", "cobertura");
        CoverageRunner::new("make test", dir, processor, executor)
    }

    #[tokio::test]
    async fn test_run_and_measure_returns_fresh_coverage() {
        let dir = tempfile::tempdir().unwrap();
        let report_path = dir.path().join("coverage.xml");
        let executor = Arc::new(MockExecutor::new(report_path, MockRun::passing(REPORT)));

        let (outcome, coverage) = runner(dir.path(), executor).run_and_measure().await.unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert!((coverage.percentage - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_missing_report_surfaces_as_coverage_error() {
        let dir = tempfile::tempdir().unwrap();
        let report_path = dir.path().join("coverage.xml");
        // The scripted run never writes the report.
        let executor = Arc::new(MockExecutor::new(report_path, MockRun::failing(1, "boom")));

        let err = runner(dir.path(), executor).run_and_measure().await.unwrap_err();
        assert!(matches!(
            err,
            RunnerError::Coverage(CoverageError::ReportMissing(_))
        ));
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_data_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let report_path = dir.path().join("coverage.xml");
        let executor = Arc::new(MockExecutor::new(
            report_path,
            MockRun { exit_code: 7, stdout: String::new(), stderr: "failed".into(), report_content: None },
        ));

        let outcome = runner(dir.path(), executor).execute().await.unwrap();
        assert_eq!(outcome.exit_code, 7);
        assert_eq!(outcome.stderr, "failed");
    }
}
