//! Command-line interface for the covgen binary.

pub mod output;

use anyhow::Result;
use clap::Parser;
use console::style;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, warn};

use crate::adapters::{AnthropicClient, HtmlReportSink, ShellExecutor};
use crate::application::{CoverageRunner, GenerationPhase, GeneratorOptions, TestGenerator};
use crate::coverage::CoverageProcessor;
use crate::domain::errors::{CoverageShortfall, SetupError};
use crate::domain::models::{Config, ModelConfig};

/// Iteratively generate unit tests until a coverage target is reached.
#[derive(Debug, Parser)]
#[command(
    name = "covgen",
    version,
    about = "Coverage-driven unit test generation agent"
)]
pub struct Cli {
    /// Path of the source file to be tested.
    #[arg(long)]
    pub source_file_path: PathBuf,

    /// Path to the existing test file.
    #[arg(long)]
    pub test_file_path: PathBuf,

    /// Where to write the grown test file; the input test file is copied
    /// here before the loop starts. Omit to edit the test file in place.
    #[arg(long)]
    pub test_file_output_path: Option<PathBuf>,

    /// Path to the coverage report the test command generates.
    #[arg(long)]
    pub code_coverage_report_path: PathBuf,

    /// Command that runs the test suite and regenerates the report.
    #[arg(long)]
    pub test_command: String,

    /// Directory to run the test command in. Defaults to the current
    /// directory.
    #[arg(long)]
    pub test_command_dir: Option<PathBuf>,

    /// Additional files to include as prompt context. Repeatable.
    #[arg(long)]
    pub included_files: Vec<PathBuf>,

    /// Coverage report format: cobertura, jacoco, or lcov.
    #[arg(long, default_value = "cobertura")]
    pub coverage_type: String,

    /// Path for the HTML results report.
    #[arg(long, default_value = "test_results.html")]
    pub report_filepath: PathBuf,

    /// Target coverage percentage (defaults to 90).
    #[arg(long)]
    pub desired_coverage: Option<u32>,

    /// Maximum number of generation rounds (defaults to 10).
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Free-text instructions appended to the prompt.
    #[arg(long, default_value = "")]
    pub additional_instructions: String,

    /// Model identifier to use.
    #[arg(long)]
    pub model: Option<String>,

    /// Base URL of the model API.
    #[arg(long)]
    pub api_base: Option<String>,

    /// Exit non-zero when the coverage target is not reached within the
    /// iteration budget.
    #[arg(long)]
    pub strict_coverage: bool,

    /// Reject candidates that pass but do not raise observed coverage.
    #[arg(long)]
    pub require_coverage_increase: bool,

    /// Path to a YAML config file (instead of .covgen/config.yaml).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the run summary as JSON instead of a table.
    #[arg(long, global = true)]
    pub json: bool,
}

/// Validate inputs, assemble the collaborators, and drive the run.
pub async fn execute(cli: Cli, config: Config) -> Result<()> {
    validate_paths(&cli)?;
    let test_path = duplicate_test_file(&cli).await?;
    let included_files = read_included_files(&cli.included_files).await;
    let language = detect_language(&cli.source_file_path);

    let model_config = resolve_model_config(&cli, &config);
    let max_model_tokens = model_config.max_tokens;
    let model = Arc::new(AnthropicClient::new(model_config, config.retry.clone())?);

    let processor = CoverageProcessor::new(
        cli.code_coverage_report_path.clone(),
        cli.source_file_path.clone(),
        cli.coverage_type.clone(),
    );
    let command_dir = match cli.test_command_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let runner = CoverageRunner::new(
        cli.test_command.clone(),
        command_dir,
        processor,
        Arc::new(ShellExecutor),
    );

    let desired_coverage = cli
        .desired_coverage
        .unwrap_or(config.generation.desired_coverage);
    let strict_coverage = cli.strict_coverage || config.generation.strict_coverage;

    let options = GeneratorOptions {
        source_path: cli.source_file_path.clone(),
        test_path,
        report_output_path: cli.report_filepath.clone(),
        included_files,
        additional_instructions: cli.additional_instructions.clone(),
        language,
        desired_coverage,
        max_iterations: cli.max_iterations.unwrap_or(config.generation.max_iterations),
        max_tests_per_round: config.generation.max_tests_per_round,
        max_model_tokens,
        require_coverage_increase: cli.require_coverage_increase
            || config.generation.require_coverage_increase,
        strict_coverage,
    };

    let generator = TestGenerator::new(options, model, runner, Arc::new(HtmlReportSink));
    let summary = generator.run().await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    if strict_coverage && summary.phase == GenerationPhase::Exhausted {
        return Err(CoverageShortfall {
            achieved: summary.final_coverage * 100.0,
            desired: desired_coverage,
        }
        .into());
    }

    Ok(())
}

/// Map run errors to the process exit status. Strict-mode coverage
/// shortfall gets its own status so CI can tell it apart from crashes.
pub fn handle_error(err: &anyhow::Error) -> ! {
    error!("{err:#}");
    eprintln!("{} {err:#}", style("error:").red().bold());

    if err.downcast_ref::<CoverageShortfall>().is_some() {
        std::process::exit(2);
    }
    std::process::exit(1);
}

fn validate_paths(cli: &Cli) -> Result<(), SetupError> {
    if !cli.source_file_path.exists() {
        return Err(SetupError::SourceFileMissing(cli.source_file_path.clone()));
    }
    if !cli.test_file_path.exists() {
        return Err(SetupError::TestFileMissing(cli.test_file_path.clone()));
    }
    Ok(())
}

/// Copy the input test file to the output path when one is given; all
/// mutation then happens on the copy. Otherwise edit in place.
async fn duplicate_test_file(cli: &Cli) -> Result<PathBuf> {
    match cli.test_file_output_path.clone() {
        Some(output_path) if output_path != cli.test_file_path => {
            tokio::fs::copy(&cli.test_file_path, &output_path).await?;
            Ok(output_path)
        }
        Some(output_path) => Ok(output_path),
        None => Ok(cli.test_file_path.clone()),
    }
}

/// Render extra context files into the prompt's includes block.
/// Unreadable files are logged and skipped rather than failing the run.
async fn read_included_files(paths: &[PathBuf]) -> String {
    let mut rendered = String::new();
    for path in paths {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                rendered.push_str(&format!(
                    "file_path: `{}`\ncontent:\n```\n{content}\n```\n",
                    path.display()
                ));
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable included file");
            }
        }
    }
    rendered.trim_end().to_string()
}

fn resolve_model_config(cli: &Cli, config: &Config) -> ModelConfig {
    let mut model_config = config.model.clone();
    if let Some(ref model) = cli.model {
        model_config.model.clone_from(model);
    }
    if let Some(ref api_base) = cli.api_base {
        model_config.base_url.clone_from(api_base);
    }
    model_config
}

/// Language tag for the prompt, derived from the source file extension.
fn detect_language(path: &Path) -> String {
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();
    let language = match extension {
        "py" => "python",
        "js" => "javascript",
        "ts" => "typescript",
        "java" => "java",
        "go" => "go",
        "rb" => "ruby",
        "rs" => "rust",
        _ => "unknown",
    };
    language.to_string()
}

fn print_summary(summary: &crate::application::RunSummary) {
    println!();
    match summary.phase {
        GenerationPhase::Converged => {
            println!(
                "{} reached {:.2}% coverage (target {}%) in {} iteration(s)",
                style("Converged:").green().bold(),
                summary.final_coverage * 100.0,
                summary.desired_coverage,
                summary.iterations
            );
        }
        _ => {
            println!(
                "{} stopped at {:.2}% coverage (target {}%) after {} iteration(s)",
                style("Exhausted:").yellow().bold(),
                summary.final_coverage * 100.0,
                summary.desired_coverage,
                summary.iterations
            );
        }
    }

    if summary.outcomes.is_empty() {
        println!("No candidates were validated.");
        return;
    }

    println!();
    println!("{}", output::render_outcome_table(&summary.outcomes));
}
