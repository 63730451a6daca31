//! Covgen - Coverage-Driven Unit Test Generation Agent
//!
//! Covgen grows a test suite iteratively: it asks a language model for new
//! test cases, validates each candidate by running the project's own test
//! command, and stops once a coverage target is reached or the iteration
//! budget is exhausted.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Value objects, domain errors, and the ports
//!   the control loop depends on
//! - **Coverage Layer** (`coverage`): Format-specific report parsing and the
//!   report freshness guard
//! - **Application Layer** (`application`): The generation loop, test-run
//!   coordination, prompt assembly, and response decoding
//! - **Adapters Layer** (`adapters`): Anthropic API client, shell command
//!   executor, HTML report writer, and in-tree mocks
//! - **Infrastructure Layer** (`infrastructure`): Configuration loading and
//!   logging setup
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use covgen::TestGenerator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Assemble collaborators and drive the loop
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod coverage;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use application::{
    build_prompt, decode_candidates, CoverageRunner, GenerationPhase, GeneratorOptions,
    IterationState, RunSummary, RunnerError, TestGenerator,
};
pub use coverage::{verify_report_update, CoverageProcessor};
pub use domain::errors::{CommandError, CoverageError, CoverageShortfall, ModelError, SetupError};
pub use domain::models::{
    Config, CoverageResult, FailedAttempt, FailureReason, GenerationConfig, LoggingConfig,
    ModelConfig, Prompt, PromptContext, RetryConfig, TestCandidate, ValidationOutcome,
    ValidationStatus,
};
pub use domain::ports::{CommandExecutor, CommandOutcome, ModelClient, ModelCompletion, ReportSink};
pub use infrastructure::config::{ConfigError, ConfigLoader};
