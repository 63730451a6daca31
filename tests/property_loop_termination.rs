//! Property test: the loop never performs more rounds than its budget.

use std::sync::Arc;

use proptest::prelude::*;

use covgen::adapters::mock::{MockExecutor, MockModelClient, MockReportSink, MockRun};
use covgen::{
    CoverageProcessor, CoverageRunner, GenerationPhase, GeneratorOptions, TestGenerator,
};

const HALF_COVERED: &str = r#"<coverage><packages><package name="."><classes><class name="app.py" filename="app.py"><lines><line number="1" hits="1"/><line number="2" hits="0"/></lines></class></classes></package></packages></coverage>"#;

async fn run_never_converging_loop(max_iterations: u32) -> (GenerationPhase, u32, usize) {
    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("app.py");
    let test_path = dir.path().join("test_app.py");
    let report_path = dir.path().join("coverage.xml");
    std::fs::write(&source_path, "x = 1\ny = 2\n").unwrap();
    std::fs::write(&test_path, "assert True\n").unwrap();

    // Coverage stays at 50% forever and the model proposes nothing.
    let model = Arc::new(MockModelClient::new());
    let executor = Arc::new(MockExecutor::new(&report_path, MockRun::passing(HALF_COVERED)));
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
        max_iterations,
        max_tests_per_round: 4,
        max_model_tokens: 1024,
        require_coverage_increase: false,
        strict_coverage: false,
    };

    let summary = TestGenerator::new(options, model.clone(), runner, sink)
        .run()
        .await
        .unwrap();
    let prompts = model.recorded_prompts().await.len();
    (summary.phase, summary.iterations, prompts)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn the_loop_performs_exactly_max_iterations_rounds_when_never_converging(
        max_iterations in 0u32..6
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let (phase, iterations, prompts) =
            runtime.block_on(run_never_converging_loop(max_iterations));

        assert_eq!(phase, GenerationPhase::Exhausted);
        assert_eq!(iterations, max_iterations);
        // One model call per round, no more.
        assert_eq!(prompts, max_iterations as usize);
    }
}
