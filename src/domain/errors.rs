//! Domain errors for the covgen agent.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while locating or interpreting a coverage report.
#[derive(Debug, Error)]
pub enum CoverageError {
    #[error("coverage report `{}` was not generated", .0.display())]
    ReportMissing(PathBuf),

    #[error(
        "coverage report `{}` was not updated after the test command (mtime {}ms <= start {}ms)",
        .path.display(), .mtime_ms, .reference_ms
    )]
    ReportStale {
        path: PathBuf,
        mtime_ms: i64,
        reference_ms: i64,
    },

    #[error("unsupported coverage report type: {0}")]
    UnsupportedFormat(String),

    #[error("parsing for {0} coverage reports is not implemented yet")]
    NotImplemented(String),

    #[error("malformed coverage report: {0}")]
    MalformedReport(String),

    #[error("could not extract package or class name from `{}`", .0.display())]
    IdentifierNotFound(PathBuf),

    #[error("failed to read `{}`: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CoverageError {
    /// Freshness failures only invalidate the measurement that observed
    /// them; every other variant indicates a configuration mismatch between
    /// the chosen format and the actual tool output and aborts the run.
    pub const fn is_freshness(&self) -> bool {
        matches!(self, Self::ReportMissing(_) | Self::ReportStale { .. })
    }
}

/// Pre-loop validation failures. Fatal before any iteration runs.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("source file not found at `{}`", .0.display())]
    SourceFileMissing(PathBuf),

    #[error("test file not found at `{}`", .0.display())]
    TestFileMissing(PathBuf),
}

/// Failures from the model client, surfaced to the loop only after the
/// adapter's own retries are exhausted.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("ANTHROPIC_API_KEY is not set and no api_key was configured")]
    MissingApiKey,

    #[error("model request failed: {0}")]
    Transport(String),

    #[error("model API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("could not interpret model response: {0}")]
    InvalidResponse(String),
}

impl ModelError {
    /// Whether the adapter should retry this failure with backoff.
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Failure to launch the external test command at all. A command that
/// launches and exits non-zero is not an error; see `CommandOutcome`.
#[derive(Debug, Error)]
#[error("failed to spawn test command `{command}`: {source}")]
pub struct CommandError {
    pub command: String,
    #[source]
    pub source: std::io::Error,
}

/// Raised under strict coverage when the iteration budget runs out below
/// the target. Mapped to a distinct process exit status by the CLI.
#[derive(Debug, Error)]
#[error(
    "reached maximum iteration limit without achieving desired coverage \
     (current: {achieved:.2}%, desired: {desired}%)"
)]
pub struct CoverageShortfall {
    /// Final measured coverage, as a percentage in [0, 100].
    pub achieved: f64,
    /// Configured target percentage.
    pub desired: u32,
}
