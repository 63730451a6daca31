//! Control loop integration tests driven entirely by the in-tree mocks.

use std::path::Path;
use std::sync::Arc;

use covgen::adapters::mock::{MockExecutor, MockModelClient, MockModelResponse, MockReportSink, MockRun};
use covgen::{
    CoverageProcessor, CoverageRunner, FailureReason, GenerationPhase, GeneratorOptions,
    TestGenerator, ValidationStatus,
};

/// Cobertura document for `app.py` with the given per-line hit counts.
fn cobertura(lines: &[(u32, u64)]) -> String {
    let mut body = String::new();
    for (number, hits) in lines {
        body.push_str(&format!("<line number=\"{number}\" hits=\"{hits}\"/>"));
    }
    format!(
        "<coverage><packages><package name=\".\"><classes>\
         <class name=\"app.py\" filename=\"app.py\"><lines>{body}</lines></class>\
         </classes></package></packages></coverage>"
    )
}

/// Report at 50% coverage (1 covered, 1 missed).
fn report_half() -> String {
    cobertura(&[(1, 1), (2, 0)])
}

/// Report at 100% coverage.
fn report_full() -> String {
    cobertura(&[(1, 1), (2, 1)])
}

const CANDIDATE_YAML: &str = "\
new_tests:
- test_code: |-
    def test_subtract():
        assert subtract(3, 1) == 2
  new_imports_code: |-
    import math
";

struct Fixture {
    _dir: tempfile::TempDir,
    test_path: std::path::PathBuf,
    model: Arc<MockModelClient>,
    sink: Arc<MockReportSink>,
    generator: TestGenerator,
}

fn fixture(
    responses: Vec<MockModelResponse>,
    script: Vec<MockRun>,
    default_run: MockRun,
    desired_coverage: u32,
    max_iterations: u32,
    require_coverage_increase: bool,
) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("app.py");
    let test_path = dir.path().join("test_app.py");
    let report_path = dir.path().join("coverage.xml");
    std::fs::write(&source_path, "def subtract(a, b):\n    return a - b\n").unwrap();
    std::fs::write(&test_path, "def test_nothing():\n    pass\n").unwrap();

    let model = Arc::new(MockModelClient::with_responses(responses));
    let executor = Arc::new(MockExecutor::with_script(&report_path, script, default_run));
    let sink = Arc::new(MockReportSink::new());

    let processor = CoverageProcessor::new(&report_path, &source_path, "cobertura");
    let runner = CoverageRunner::new("pytest --cov", dir.path(), processor, executor);

    let options = GeneratorOptions {
        source_path,
        test_path: test_path.clone(),
        report_output_path: dir.path().join("test_results.html"),
        included_files: String::new(),
        additional_instructions: String::new(),
        language: "python".to_string(),
        desired_coverage,
        max_iterations,
        max_tests_per_round: 4,
        max_model_tokens: 4096,
        require_coverage_increase,
        strict_coverage: false,
    };
    let generator = TestGenerator::new(options, model.clone(), runner, sink.clone());

    Fixture { _dir: dir, test_path, model, sink, generator }
}

#[tokio::test]
async fn zero_candidate_rounds_exhaust_the_budget_without_moving_coverage() {
    // Scenario: desired 90, max 1, baseline 50%, model returns nothing.
    let fixture = fixture(
        Vec::new(),
        Vec::new(),
        MockRun::passing(report_half()),
        90,
        1,
        false,
    );

    let summary = fixture.generator.run().await.unwrap();

    assert_eq!(summary.phase, GenerationPhase::Exhausted);
    assert_eq!(summary.iterations, 1);
    assert!((summary.final_coverage - 0.5).abs() < f64::EPSILON);
    assert!(summary.outcomes.is_empty());
    assert_eq!(fixture.model.recorded_prompts().await.len(), 1);
}

#[tokio::test]
async fn a_passing_candidate_that_reaches_the_target_converges() {
    let fixture = fixture(
        vec![MockModelResponse::success(CANDIDATE_YAML)],
        vec![
            MockRun::passing(report_half()), // baseline
            MockRun::passing(report_full()), // candidate run
            MockRun::passing(report_full()), // post-round re-measurement
        ],
        MockRun::passing(report_full()),
        90,
        5,
        false,
    );

    let summary = fixture.generator.run().await.unwrap();

    assert_eq!(summary.phase, GenerationPhase::Converged);
    assert_eq!(summary.iterations, 1);
    assert!((summary.final_coverage - 1.0).abs() < f64::EPSILON);
    assert_eq!(summary.outcomes.len(), 1);
    assert_eq!(summary.outcomes[0].status, ValidationStatus::Pass);

    // The candidate was grafted onto the working test file.
    let grown = std::fs::read_to_string(&fixture.test_path).unwrap();
    assert!(grown.starts_with("import math\n"));
    assert!(grown.contains("def test_nothing():"));
    assert!(grown.contains("def test_subtract():"));
}

#[tokio::test]
async fn a_failing_candidate_is_reverted_and_shown_to_the_model_next_round() {
    let fixture = fixture(
        vec![
            MockModelResponse::success(CANDIDATE_YAML),
            MockModelResponse::success(""),
        ],
        vec![
            MockRun::passing(report_half()),           // baseline
            MockRun::failing(1, "AssertionError: bad"), // candidate run
            MockRun::passing(report_half()),           // round 1 re-measurement
            MockRun::passing(report_half()),           // round 2 re-measurement
        ],
        MockRun::passing(report_half()),
        90,
        2,
        false,
    );

    let original = std::fs::read_to_string(&fixture.test_path).unwrap();
    let summary = fixture.generator.run().await.unwrap();

    assert_eq!(summary.phase, GenerationPhase::Exhausted);
    assert_eq!(summary.iterations, 2);
    assert_eq!(summary.outcomes.len(), 1);
    assert_eq!(summary.outcomes[0].status, ValidationStatus::Fail);
    assert_eq!(summary.outcomes[0].reason, Some(FailureReason::TestFailure));

    // Reverted from the kept prior content.
    assert_eq!(std::fs::read_to_string(&fixture.test_path).unwrap(), original);

    // The failure is fed back exactly once, then cleared.
    let prompts = fixture.model.recorded_prompts().await;
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].user.contains("Previous Iterations Failed Tests"));
    assert!(prompts[1].user.contains("Previous Iterations Failed Tests"));
    assert!(prompts[1].user.contains("def test_subtract():"));
    assert!(prompts[1].user.contains("AssertionError: bad"));
}

#[tokio::test]
async fn a_candidate_run_that_does_not_refresh_the_report_fails_validation() {
    let fixture = fixture(
        vec![MockModelResponse::success(CANDIDATE_YAML)],
        vec![
            MockRun::passing(report_half()), // baseline
            MockRun {
                exit_code: 0,
                stdout: "tests passed".into(),
                stderr: String::new(),
                report_content: None, // report left stale
            },
            MockRun::passing(report_half()), // re-measurement
        ],
        MockRun::passing(report_half()),
        90,
        1,
        false,
    );

    let original = std::fs::read_to_string(&fixture.test_path).unwrap();
    let summary = fixture.generator.run().await.unwrap();

    assert_eq!(summary.outcomes.len(), 1);
    assert_eq!(summary.outcomes[0].status, ValidationStatus::Fail);
    assert_eq!(
        summary.outcomes[0].reason,
        Some(FailureReason::ReportNotUpdated)
    );
    assert_eq!(std::fs::read_to_string(&fixture.test_path).unwrap(), original);
}

#[tokio::test]
async fn exit_code_zero_is_sufficient_even_when_coverage_does_not_increase() {
    // Default policy: the candidate passes although the measured ratio
    // stayed at the baseline.
    let fixture = fixture(
        vec![MockModelResponse::success(CANDIDATE_YAML)],
        vec![
            MockRun::passing(report_half()),
            MockRun::passing(report_half()),
            MockRun::passing(report_half()),
        ],
        MockRun::passing(report_half()),
        90,
        1,
        false,
    );

    let summary = fixture.generator.run().await.unwrap();
    assert_eq!(summary.outcomes.len(), 1);
    assert_eq!(summary.outcomes[0].status, ValidationStatus::Pass);
}

#[tokio::test]
async fn require_coverage_increase_demotes_a_coverage_drop_to_fail() {
    let fixture = fixture(
        vec![MockModelResponse::success(CANDIDATE_YAML)],
        vec![
            MockRun::passing(report_half()),                  // baseline: 50%
            MockRun::passing(cobertura(&[(1, 1), (2, 0), (3, 0)])), // drops to 33%
            MockRun::passing(report_half()),                  // re-measurement
        ],
        MockRun::passing(report_half()),
        90,
        1,
        true,
    );

    let original = std::fs::read_to_string(&fixture.test_path).unwrap();
    let summary = fixture.generator.run().await.unwrap();

    assert_eq!(summary.outcomes.len(), 1);
    assert_eq!(summary.outcomes[0].status, ValidationStatus::Fail);
    assert_eq!(
        summary.outcomes[0].reason,
        Some(FailureReason::CoverageNotIncreased)
    );
    assert_eq!(std::fs::read_to_string(&fixture.test_path).unwrap(), original);
}

#[tokio::test]
async fn the_report_sink_receives_the_outcomes_exactly_once() {
    let fixture = fixture(
        vec![MockModelResponse::success(CANDIDATE_YAML)],
        vec![
            MockRun::passing(report_half()),
            MockRun::passing(report_full()),
            MockRun::passing(report_full()),
        ],
        MockRun::passing(report_full()),
        90,
        5,
        false,
    );

    let sink = fixture.sink.clone();
    fixture.generator.run().await.unwrap();

    assert_eq!(sink.write_count().await, 1);
    assert_eq!(sink.last_outcomes().await.unwrap().len(), 1);
}

#[tokio::test]
async fn a_model_transport_error_is_fatal_but_the_report_is_still_written() {
    let fixture = fixture(
        vec![MockModelResponse::failure()],
        Vec::new(),
        MockRun::passing(report_half()),
        90,
        3,
        false,
    );

    let sink = fixture.sink.clone();
    let result = fixture.generator.run().await;

    assert!(result.is_err());
    // Whatever was gathered before the failure still reaches the sink.
    assert_eq!(sink.write_count().await, 1);
    assert!(sink.last_outcomes().await.unwrap().is_empty());
}

#[tokio::test]
async fn an_already_covered_baseline_converges_without_any_model_call() {
    let fixture = fixture(
        Vec::new(),
        Vec::new(),
        MockRun::passing(report_full()),
        90,
        5,
        false,
    );

    let summary = fixture.generator.run().await.unwrap();

    assert_eq!(summary.phase, GenerationPhase::Converged);
    assert_eq!(summary.iterations, 0);
    assert!(fixture.model.recorded_prompts().await.is_empty());
}

#[tokio::test]
async fn a_format_mismatch_aborts_the_run_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("app.py");
    let test_path = dir.path().join("test_app.py");
    let report_path = dir.path().join("coverage.xml");
    std::fs::write(&source_path, "x = 1\n").unwrap();
    std::fs::write(&test_path, "assert True\n").unwrap();

    let model = Arc::new(MockModelClient::new());
    let executor = Arc::new(MockExecutor::new(&report_path, MockRun::passing("not xml")));
    let sink = Arc::new(MockReportSink::new());

    let processor = CoverageProcessor::new(&report_path, &source_path, "cobertura");
    let runner = CoverageRunner::new("pytest", dir.path(), processor, executor);
    let options = GeneratorOptions {
        source_path,
        test_path,
        report_output_path: dir.path().join("test_results.html"),
        included_files: String::new(),
        additional_instructions: String::new(),
        language: "python".to_string(),
        desired_coverage: 90,
        max_iterations: 3,
        max_tests_per_round: 4,
        max_model_tokens: 4096,
        require_coverage_increase: false,
        strict_coverage: false,
    };

    let result = TestGenerator::new(options, model, runner, sink.clone())
        .run()
        .await;
    assert!(result.is_err());
    assert_eq!(sink.write_count().await, 1);
}

#[tokio::test]
async fn candidates_beyond_the_per_round_bound_are_dropped() {
    let mut yaml = String::from("new_tests:\n");
    for index in 0..6 {
        yaml.push_str(&format!("- test_code: \"assert {index} == {index}\"\n"));
    }

    let fixture = fixture(
        vec![MockModelResponse::success(yaml)],
        vec![MockRun::passing(report_half())],
        MockRun::passing(report_half()),
        90,
        1,
        false,
    );

    let summary = fixture.generator.run().await.unwrap();
    // Only the first four candidates were validated.
    assert_eq!(summary.outcomes.len(), 4);
}

#[tokio::test]
async fn outcomes_accumulate_across_rounds_in_order() {
    let fixture = fixture(
        vec![
            MockModelResponse::success(CANDIDATE_YAML),
            MockModelResponse::success(CANDIDATE_YAML),
        ],
        vec![
            MockRun::passing(report_half()),   // baseline
            MockRun::failing(2, "syntax error"), // round 1 candidate
            MockRun::passing(report_half()),   // round 1 re-measurement
            MockRun::passing(report_half()),   // round 2 candidate
            MockRun::passing(report_half()),   // round 2 re-measurement
        ],
        MockRun::passing(report_half()),
        90,
        2,
        false,
    );

    let summary = fixture.generator.run().await.unwrap();

    assert_eq!(summary.outcomes.len(), 2);
    assert_eq!(summary.outcomes[0].status, ValidationStatus::Fail);
    assert_eq!(summary.outcomes[0].reason, Some(FailureReason::BuildError));
    assert_eq!(summary.outcomes[1].status, ValidationStatus::Pass);
}

#[tokio::test]
async fn report_path_is_only_read_never_written_by_the_loop() {
    // The report file is owned by the (mock) external tool; the loop's
    // only writes go to the test file and the results report.
    let fixture = fixture(
        Vec::new(),
        Vec::new(),
        MockRun::passing(report_half()),
        90,
        1,
        false,
    );
    let report_path = fixture._dir.path().join("coverage.xml");

    fixture.generator.run().await.unwrap();

    let content = std::fs::read_to_string(report_path).unwrap();
    assert_eq!(content, report_half());
    assert!(Path::new(&fixture.test_path).exists());
}
