//! Domain models: immutable value objects exchanged between the loop and
//! its collaborators.

pub mod candidate;
pub mod config;
pub mod coverage;
pub mod prompt;

pub use candidate::{
    FailedAttempt, FailureReason, TestCandidate, ValidationOutcome, ValidationStatus,
};
pub use config::{Config, GenerationConfig, LoggingConfig, ModelConfig, RetryConfig};
pub use coverage::CoverageResult;
pub use prompt::{Prompt, PromptContext};
