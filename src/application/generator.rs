//! The coverage-driven generation loop.
//!
//! One logical thread of control per run: request candidates from the
//! model, validate each by running the project's own test command,
//! re-measure, and decide whether to continue. Candidates are validated
//! strictly in sequence because each run mutates the working test file
//! and the coverage report on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::decode::decode_candidates;
use crate::application::prompt_builder::{build_prompt, number_lines};
use crate::application::runner::{CoverageRunner, RunnerError};
use crate::domain::models::{
    CoverageResult, FailedAttempt, FailureReason, Prompt, PromptContext, TestCandidate,
    ValidationOutcome,
};
use crate::domain::ports::{CommandOutcome, ModelClient, ReportSink};

/// Phase of the generation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPhase {
    /// Establishing baseline coverage before any generation.
    Analyzing,
    /// Requesting candidates from the model.
    Generating,
    /// Applying and running candidates one at a time.
    Validating,
    /// Re-measuring and checking stop conditions.
    Deciding,
    /// Terminal: the coverage target was reached.
    Converged,
    /// Terminal: the iteration budget ran out below target.
    Exhausted,
}

impl GenerationPhase {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Converged | Self::Exhausted)
    }
}

/// Loop-local state. Initialized once before the first round, mutated only
/// by the generator, and handed to the report sink when the run ends.
#[derive(Debug)]
pub struct IterationState {
    /// Authoritative coverage ratio, updated only by the post-round
    /// re-measurement (and the baseline).
    pub current_coverage: f64,
    /// Completed rounds.
    pub iteration: u32,
    /// Target percentage (1-100).
    pub desired_coverage: u32,
    pub max_iterations: u32,
    /// Every candidate's outcome, across all rounds, in order.
    pub outcomes: Vec<ValidationOutcome>,
    /// Tag for correlating this run's log lines.
    pub run_id: Uuid,
}

impl IterationState {
    fn new(desired_coverage: u32, max_iterations: u32) -> Self {
        Self {
            current_coverage: 0.0,
            iteration: 0,
            desired_coverage,
            max_iterations,
            outcomes: Vec::new(),
            run_id: Uuid::new_v4(),
        }
    }

    /// True once the measured ratio meets the configured target.
    pub fn target_reached(&self) -> bool {
        self.current_coverage >= f64::from(self.desired_coverage) / 100.0
    }
}

/// Final summary handed back to the caller.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    /// Terminal phase the loop reached.
    pub phase: GenerationPhase,
    /// Rounds completed.
    pub iterations: u32,
    /// Final coverage ratio in [0, 1].
    pub final_coverage: f64,
    /// Desired coverage percentage the run was configured with.
    pub desired_coverage: u32,
    /// Every candidate outcome, in validation order.
    pub outcomes: Vec<ValidationOutcome>,
}

/// Operator-supplied inputs for one generation run.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// File under test.
    pub source_path: PathBuf,
    /// Working test file; candidates are grafted onto it in place.
    pub test_path: PathBuf,
    /// Destination for the final results report.
    pub report_output_path: PathBuf,
    /// Pre-rendered extra context files for the prompt.
    pub included_files: String,
    pub additional_instructions: String,
    /// Language tag for the source file, e.g. `python`.
    pub language: String,
    pub desired_coverage: u32,
    pub max_iterations: u32,
    /// Upper bound on candidates validated per round.
    pub max_tests_per_round: usize,
    /// Token budget for each model response.
    pub max_model_tokens: u32,
    /// Reject passing candidates whose run lowered the observed ratio.
    pub require_coverage_increase: bool,
    /// Log exhaustion at error level; the CLI maps it to exit status 2.
    pub strict_coverage: bool,
}

/// The iteration controller.
///
/// Owns the working test file for the duration of the run; the coverage
/// report file is written by the external test command and only read here.
pub struct TestGenerator {
    options: GeneratorOptions,
    model: Arc<dyn ModelClient>,
    runner: CoverageRunner,
    sink: Arc<dyn ReportSink>,
    state: IterationState,
    phase: GenerationPhase,
    /// Failures from the previous round, cleared once rendered into the
    /// next prompt.
    failed_attempts: Vec<FailedAttempt>,
    /// Most recent measured ratio, including advisory per-candidate runs.
    last_observed: f64,
    /// Most recent parsed report, rendered into the next prompt.
    last_report: CoverageResult,
}

impl TestGenerator {
    pub fn new(
        options: GeneratorOptions,
        model: Arc<dyn ModelClient>,
        runner: CoverageRunner,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        let state = IterationState::new(options.desired_coverage, options.max_iterations);
        Self {
            options,
            model,
            runner,
            sink,
            state,
            phase: GenerationPhase::Analyzing,
            failed_attempts: Vec::new(),
            last_observed: 0.0,
            last_report: CoverageResult::from_lines(Vec::new(), Vec::new()),
        }
    }

    /// Drive the loop to a terminal phase.
    ///
    /// The results report is written exactly once, whether the loop
    /// converged, exhausted its budget, or died on a fatal error partway
    /// through; whatever outcomes were gathered are preserved.
    pub async fn run(mut self) -> Result<RunSummary> {
        let loop_result = self.run_loop().await;
        self.write_report().await;
        loop_result?;

        info!(
            run_id = %self.state.run_id,
            phase = ?self.phase,
            iterations = self.state.iteration,
            coverage = %format_ratio(self.state.current_coverage),
            "generation run finished"
        );

        Ok(RunSummary {
            phase: self.phase,
            iterations: self.state.iteration,
            final_coverage: self.state.current_coverage,
            desired_coverage: self.options.desired_coverage,
            outcomes: std::mem::take(&mut self.state.outcomes),
        })
    }

    async fn run_loop(&mut self) -> Result<()> {
        info!(
            run_id = %self.state.run_id,
            source = %self.options.source_path.display(),
            "establishing baseline coverage"
        );
        let (_, baseline) = self
            .runner
            .run_and_measure()
            .await
            .context("failed to establish baseline coverage")?;
        self.state.current_coverage = baseline.percentage;
        self.last_observed = baseline.percentage;
        info!(coverage = %format_ratio(baseline.percentage), "baseline measured");
        self.last_report = baseline;

        loop {
            if self.state.target_reached() {
                self.phase = GenerationPhase::Converged;
                info!(
                    iterations = self.state.iteration,
                    coverage = %format_ratio(self.state.current_coverage),
                    desired = self.state.desired_coverage,
                    "reached target coverage"
                );
                return Ok(());
            }
            if self.state.iteration >= self.state.max_iterations {
                self.phase = GenerationPhase::Exhausted;
                let message = format!(
                    "reached maximum iteration limit without achieving desired coverage \
                     (current: {}, desired: {}%)",
                    format_ratio(self.state.current_coverage),
                    self.state.desired_coverage
                );
                if self.options.strict_coverage {
                    error!("{message}");
                } else {
                    info!("{message}");
                }
                return Ok(());
            }

            info!(
                iteration = self.state.iteration,
                coverage = %format_ratio(self.state.current_coverage),
                desired = self.state.desired_coverage,
                "starting generation round"
            );
            self.run_round().await?;
            self.state.iteration += 1;
        }
    }

    /// One full generate -> validate -> re-measure cycle.
    async fn run_round(&mut self) -> Result<()> {
        self.phase = GenerationPhase::Generating;
        let prompt = self.build_round_prompt().await?;
        if prompt.user.trim().is_empty() {
            warn!("prompt rendering produced an empty user prompt, skipping round");
            return Ok(());
        }

        let completion = self
            .model
            .invoke(&prompt, self.options.max_model_tokens)
            .await
            .context("model invocation failed")?;
        debug!(
            prompt_tokens = completion.prompt_tokens,
            completion_tokens = completion.completion_tokens,
            "model responded"
        );

        let mut candidates = decode_candidates(&completion.text);
        if candidates.is_empty() {
            warn!("model response contained no usable test candidates");
        } else if candidates.len() > self.options.max_tests_per_round {
            warn!(
                proposed = candidates.len(),
                kept = self.options.max_tests_per_round,
                "model exceeded the per-round candidate bound, truncating"
            );
            candidates.truncate(self.options.max_tests_per_round);
        }

        self.phase = GenerationPhase::Validating;
        for (index, candidate) in candidates.into_iter().enumerate() {
            debug!(candidate = index, "validating candidate");
            self.validate_candidate(candidate).await?;
        }

        self.phase = GenerationPhase::Deciding;
        self.remeasure().await
    }

    /// Assemble the prompt context for this round, consuming the failed
    /// attempts accumulated during the previous one.
    async fn build_round_prompt(&mut self) -> Result<Prompt> {
        let source = read_file(&self.options.source_path).await?;
        let test = read_file(&self.options.test_path).await?;
        let failed_test_runs = render_failed_attempts(&self.failed_attempts);
        self.failed_attempts.clear();

        let context = PromptContext {
            source_file_name: file_name(&self.options.source_path),
            test_file_name: file_name(&self.options.test_path),
            source_file_numbered: number_lines(&source),
            test_file_numbered: number_lines(&test),
            coverage_report: self.last_report.summary(),
            included_files: self.options.included_files.clone(),
            additional_instructions: self.options.additional_instructions.clone(),
            failed_test_runs,
            language: self.options.language.clone(),
            max_tests: self.options.max_tests_per_round,
        };
        Ok(build_prompt(&context))
    }

    /// Apply one candidate to the working test file and run the suite.
    ///
    /// Exit code 0 is sufficient for a pass; the post-candidate ratio is
    /// recorded as advisory either way. Failed candidates are reverted
    /// from the kept prior content and archived for the next prompt.
    async fn validate_candidate(&mut self, candidate: TestCandidate) -> Result<()> {
        let original = read_file(&self.options.test_path).await?;
        let updated = apply_candidate(&original, &candidate);
        write_file(&self.options.test_path, &updated).await?;

        let before = self.last_observed;
        let outcome = self
            .runner
            .execute()
            .await
            .context("failed to launch test command")?;

        if outcome.exit_code != 0 {
            let reason = FailureReason::from_exit_code(outcome.exit_code);
            warn!(exit_code = outcome.exit_code, reason = %reason, "candidate failed test run");
            return self.reject(candidate, reason, &outcome, &original).await;
        }

        match self.runner.measure(outcome.started_at_ms).await {
            Ok(measured) => {
                let ratio = measured.percentage;
                if self.options.require_coverage_increase && ratio < before {
                    warn!(
                        before = %format_ratio(before),
                        after = %format_ratio(ratio),
                        "coverage dropped, rejecting candidate"
                    );
                    return self
                        .reject(candidate, FailureReason::CoverageNotIncreased, &outcome, &original)
                        .await;
                }
                if ratio < before {
                    debug!(
                        before = %format_ratio(before),
                        after = %format_ratio(ratio),
                        "candidate passed without raising coverage"
                    );
                }
                self.last_observed = ratio;
                info!(coverage = %format_ratio(ratio), "candidate passed validation");
                self.state.outcomes.push(ValidationOutcome::pass(
                    outcome.exit_code,
                    outcome.stdout,
                    outcome.stderr,
                    candidate.test_code,
                ));
                Ok(())
            }
            Err(err) if err.is_freshness() => {
                warn!(error = %err, "report missing or stale after candidate run");
                self.reject(candidate, FailureReason::ReportNotUpdated, &outcome, &original)
                    .await
            }
            Err(err) => Err(err).context("coverage measurement failed"),
        }
    }

    /// Restore the prior test file content, then record the rejection and
    /// archive the candidate for the next prompt.
    async fn reject(
        &mut self,
        candidate: TestCandidate,
        reason: FailureReason,
        outcome: &CommandOutcome,
        original: &str,
    ) -> Result<()> {
        write_file(&self.options.test_path, original).await?;

        self.state.outcomes.push(ValidationOutcome::fail(
            reason,
            outcome.exit_code,
            outcome.stdout.clone(),
            outcome.stderr.clone(),
            candidate.test_code.clone(),
        ));
        let error_output = if outcome.stderr.trim().is_empty() {
            outcome.stdout.clone()
        } else {
            outcome.stderr.clone()
        };
        self.failed_attempts.push(FailedAttempt { candidate, reason, error_output });
        Ok(())
    }

    /// Authoritative post-round measurement against the grown test file.
    /// This is the only place `current_coverage` is updated after the
    /// baseline.
    async fn remeasure(&mut self) -> Result<()> {
        match self.runner.run_and_measure().await {
            Ok((_, result)) => {
                self.state.current_coverage = result.percentage;
                self.last_observed = result.percentage;
                info!(
                    coverage = %format_ratio(result.percentage),
                    "round re-measurement complete"
                );
                self.last_report = result;
                Ok(())
            }
            Err(RunnerError::Coverage(err)) if err.is_freshness() => {
                // The round produced no trustworthy report; keep the
                // previous ratio rather than poisoning the stop decision.
                error!(error = %err, "post-round measurement unusable, keeping previous coverage");
                Ok(())
            }
            Err(err) => Err(err).context("post-round coverage measurement failed"),
        }
    }

    async fn write_report(&self) {
        match self
            .sink
            .write(&self.state.outcomes, &self.options.report_output_path)
            .await
        {
            Ok(()) => info!(
                path = %self.options.report_output_path.display(),
                results = self.state.outcomes.len(),
                "results report written"
            ),
            Err(err) => warn!(
                error = %err,
                path = %self.options.report_output_path.display(),
                "failed to write results report"
            ),
        }
    }
}

/// Graft a candidate onto the current test file text: imports first, test
/// code appended after the existing content.
fn apply_candidate(original: &str, candidate: &TestCandidate) -> String {
    let mut updated = String::new();
    if let Some(imports) = candidate.new_imports_code.as_deref() {
        let imports = imports.trim();
        if !imports.is_empty() {
            updated.push_str(imports);
            updated.push('\n');
        }
    }
    updated.push_str(original.trim_end());
    updated.push_str("\n\n\n");
    updated.push_str(candidate.test_code.trim_end());
    updated.push('\n');
    updated
}

/// Render the previous round's failures into the prompt's feedback block.
fn render_failed_attempts(attempts: &[FailedAttempt]) -> String {
    let mut rendered = String::new();
    for attempt in attempts {
        rendered.push_str(&format!("Failed Test:\n```\n{}\n```\n", attempt.candidate.test_code));
        if attempt.error_output.trim().is_empty() {
            rendered.push_str("\n\n");
        } else {
            rendered.push_str(&format!(
                "Error message for test above:\n{}\n\n\n",
                attempt.error_output
            ));
        }
    }
    rendered
}

fn format_ratio(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string()
}

async fn read_file(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

async fn write_file(path: &Path, content: &str) -> Result<()> {
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_candidate_appends_test_code() {
        let candidate = TestCandidate::new("def test_new():\n    assert True");
        let updated = apply_candidate("def test_old():\n    pass\n", &candidate);
        assert!(updated.starts_with("def test_old():"));
        assert!(updated.trim_end().ends_with("assert True"));
    }

    #[test]
    fn test_apply_candidate_prepends_imports() {
        let candidate = TestCandidate {
            test_code: "def test_new():\n    assert True".into(),
            new_imports_code: Some("import pytest".into()),
            rationale: None,
        };
        let updated = apply_candidate("def test_old():\n    pass\n", &candidate);
        assert!(updated.starts_with("import pytest\n"));
    }

    #[test]
    fn test_apply_candidate_ignores_blank_imports() {
        let candidate = TestCandidate {
            test_code: "assert True".into(),
            new_imports_code: Some("   \n".into()),
            rationale: None,
        };
        let updated = apply_candidate("x = 1", &candidate);
        assert!(updated.starts_with("x = 1"));
    }

    #[test]
    fn test_render_failed_attempts() {
        let attempts = vec![
            FailedAttempt {
                candidate: TestCandidate::new("def test_a(): assert False"),
                reason: FailureReason::TestFailure,
                error_output: "AssertionError".into(),
            },
            FailedAttempt {
                candidate: TestCandidate::new("def test_b(): pass"),
                reason: FailureReason::ReportNotUpdated,
                error_output: String::new(),
            },
        ];
        let rendered = render_failed_attempts(&attempts);
        assert!(rendered.contains("def test_a(): assert False"));
        assert!(rendered.contains("Error message for test above:\nAssertionError"));
        assert!(rendered.contains("def test_b(): pass"));
    }

    #[test]
    fn test_target_reached_boundary() {
        let mut state = IterationState::new(90, 10);
        state.current_coverage = 0.899;
        assert!(!state.target_reached());
        state.current_coverage = 0.9;
        assert!(state.target_reached());
        state.current_coverage = 0.95;
        assert!(state.target_reached());
    }

    #[test]
    fn test_terminal_phases() {
        assert!(GenerationPhase::Converged.is_terminal());
        assert!(GenerationPhase::Exhausted.is_terminal());
        assert!(!GenerationPhase::Analyzing.is_terminal());
        assert!(!GenerationPhase::Validating.is_terminal());
    }
}
