//! Prompt value objects exchanged with the model client.

/// System and user halves of one model request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Everything the prompt builder may substitute into the templates.
///
/// Every recognized option is an explicit field with an empty-string
/// default; an empty field renders its section as nothing.
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    pub source_file_name: String,
    pub test_file_name: String,
    /// Source file content with `N ` line-number prefixes.
    pub source_file_numbered: String,
    /// Test file content with `N ` line-number prefixes.
    pub test_file_numbered: String,
    /// Rendering of the latest `CoverageResult`.
    pub coverage_report: String,
    /// Pre-rendered `file_path`/`content` blocks for extra context files.
    pub included_files: String,
    pub additional_instructions: String,
    /// Rendering of the previous iteration's failed attempts.
    pub failed_test_runs: String,
    /// Language tag for the source file, e.g. `python`.
    pub language: String,
    /// Upper bound on candidates the model is asked for in one round.
    pub max_tests: usize,
}
