//! Candidate tests and the records kept about validating them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single proposed unit test decoded from one model response.
///
/// Owned by the iteration that produced it; discarded after validation
/// (failed candidates are archived into a [`FailedAttempt`] first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCandidate {
    /// Source text of the proposed test.
    pub test_code: String,
    /// Import statements to prepend to the test file, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_imports_code: Option<String>,
    /// Free-text rationale the model attached to the candidate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl TestCandidate {
    /// Candidate with only test code, no imports or rationale.
    pub fn new(test_code: impl Into<String>) -> Self {
        Self { test_code: test_code.into(), new_imports_code: None, rationale: None }
    }
}

/// Whether a candidate survived validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Pass,
    Fail,
}

/// Why a candidate was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    BuildError,
    TestFailure,
    CoverageNotIncreased,
    ReportNotUpdated,
}

impl FailureReason {
    /// Classify a non-zero exit status. Test runners conventionally exit 1
    /// when tests ran and failed; any other status means the suite never
    /// ran (compile or collection error).
    pub const fn from_exit_code(code: i32) -> Self {
        if code == 1 {
            Self::TestFailure
        } else {
            Self::BuildError
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::BuildError => "build error",
            Self::TestFailure => "test runtime failure",
            Self::CoverageNotIncreased => "coverage did not increase",
            Self::ReportNotUpdated => "coverage report not generated or stale",
        };
        write!(f, "{text}")
    }
}

/// Record of applying and running one candidate. Appended to the run-level
/// outcome list and never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub status: ValidationStatus,
    /// Set only when `status` is `Fail`.
    pub reason: Option<FailureReason>,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// The candidate's source text, kept for the final report.
    pub test_code: String,
    pub recorded_at: DateTime<Utc>,
}

impl ValidationOutcome {
    /// Record a passing candidate.
    pub fn pass(
        exit_code: i32,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        test_code: impl Into<String>,
    ) -> Self {
        Self {
            status: ValidationStatus::Pass,
            reason: None,
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
            test_code: test_code.into(),
            recorded_at: Utc::now(),
        }
    }

    /// Record a rejected candidate with the reason it failed.
    pub fn fail(
        reason: FailureReason,
        exit_code: i32,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        test_code: impl Into<String>,
    ) -> Self {
        Self {
            status: ValidationStatus::Fail,
            reason: Some(reason),
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
            test_code: test_code.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// A rejected candidate carried into the next prompt so the model does not
/// propose it again. Cleared once rendered into that prompt, so failures
/// never accumulate across more than one iteration.
#[derive(Debug, Clone)]
pub struct FailedAttempt {
    pub candidate: TestCandidate,
    pub reason: FailureReason,
    /// Captured output shown back to the model alongside the test.
    pub error_output: String,
}
