//! Prompt assembly for the test-generation request.
//!
//! Optional sections (extra context files, operator instructions, failed
//! attempts from the previous round) render as nothing when their context
//! field is empty.

use crate::domain::models::{Prompt, PromptContext};

/// Prefix every line of `content` with its 1-based line number, matching
/// the numbering the coverage report refers to.
pub fn number_lines(content: &str) -> String {
    content
        .lines()
        .enumerate()
        .map(|(index, line)| format!("{} {line}", index + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the system and user prompts for one generation round.
pub fn build_prompt(context: &PromptContext) -> Prompt {
    Prompt {
        system: system_prompt(context),
        user: user_prompt(context),
    }
}

fn system_prompt(context: &PromptContext) -> String {
    format!(
        "You are a code assistant that accepts a {language} source file and a {language} test file. \
         Your goal is to generate additional unit tests in order to increase the code coverage of \
         the source file. Added tests must be correct: they must compile, run, and pass against \
         the current implementation.",
        language = context.language
    )
}

fn user_prompt(context: &PromptContext) -> String {
    format!(
        "## Source File\n\
         Here is the source file that you will be writing tests against, called `{source_name}`. \
         Line numbers have been added for clarity and are not part of the original code.\n\
         =========\n\
         {source_numbered}\n\
         =========\n\
         \n\
         ## Test File\n\
         Here is the file that contains the existing tests, called `{test_name}`. \
         Line numbers have been added for clarity and are not part of the original code.\n\
         =========\n\
         {test_numbered}\n\
         =========\n\
         {includes}{failed_tests}{instructions}\n\
         ## Code Coverage\n\
         The following is the existing code coverage report. Lines not yet covered are the ones \
         your new tests should exercise:\n\
         =========\n\
         {coverage}\n\
         =========\n\
         \n\
         ## Response\n\
         Respond with YAML only, no prose. The top-level key must be `new_tests`, an ordered list \
         of at most {max_tests} entries. Each entry must have a `test_code` field containing one \
         complete test (use a `|-` block scalar), and may have a `new_imports_code` field with \
         import statements the test needs.",
        source_name = context.source_file_name,
        source_numbered = context.source_file_numbered,
        test_name = context.test_file_name,
        test_numbered = context.test_file_numbered,
        includes = includes_section(&context.included_files),
        failed_tests = failed_tests_section(&context.failed_test_runs),
        instructions = instructions_section(&context.additional_instructions),
        coverage = context.coverage_report,
        max_tests = context.max_tests,
    )
}

fn includes_section(included_files: &str) -> String {
    if included_files.is_empty() {
        return String::new();
    }
    format!(
        "\n## Additional Includes\n\
         The following is a set of included files used as context for the source code above. \
         This is usually included libraries needed as context to write better tests:\n\
         ======\n\
         {included_files}\n\
         ======\n"
    )
}

fn failed_tests_section(failed_test_runs: &str) -> String {
    if failed_test_runs.is_empty() {
        return String::new();
    }
    format!(
        "\n## Previous Iterations Failed Tests\n\
         Below is a list of failed tests that you generated in previous iterations. \
         Do not generate the same tests again, and take the failed tests into account when \
         generating new tests:\n\
         ======\n\
         {failed_test_runs}\n\
         ======\n"
    )
}

fn instructions_section(additional_instructions: &str) -> String {
    if additional_instructions.is_empty() {
        return String::new();
    }
    format!(
        "\n## Additional Instructions\n\
         ======\n\
         {additional_instructions}\n\
         ======\n"
    )
}
