//! Format dispatch for coverage report parsing.

use std::path::PathBuf;

use crate::coverage::{cobertura, freshness, jacoco};
use crate::domain::errors::CoverageError;
use crate::domain::models::CoverageResult;

/// Format-dispatching coverage report reader for one source file.
///
/// The format is carried as the operator-supplied string so that an
/// unrecognized value surfaces verbatim in the error.
#[derive(Debug, Clone)]
pub struct CoverageProcessor {
    report_path: PathBuf,
    source_path: PathBuf,
    format: String,
}

impl CoverageProcessor {
    pub fn new(
        report_path: impl Into<PathBuf>,
        source_path: impl Into<PathBuf>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            report_path: report_path.into(),
            source_path: source_path.into(),
            format: format.into(),
        }
    }

    /// Verify the report was regenerated after `reference_time_ms`, then
    /// parse it.
    pub async fn process(&self, reference_time_ms: i64) -> Result<CoverageResult, CoverageError> {
        freshness::verify_report_update(&self.report_path, reference_time_ms).await?;
        self.parse().await
    }

    /// Parse the report without the freshness check.
    pub async fn parse(&self) -> Result<CoverageResult, CoverageError> {
        match self.format.as_str() {
            "cobertura" => cobertura::parse(&self.report_path, &self.source_path).await,
            "jacoco" => jacoco::parse(&self.report_path, &self.source_path).await,
            "lcov" => Err(CoverageError::NotImplemented("lcov".to_string())),
            other => Err(CoverageError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unsupported_format_carries_the_string() {
        let processor = CoverageProcessor::new("cov.xml", "app.py", "unsupported_type");
        let err = processor.parse().await.unwrap_err();
        match err {
            CoverageError::UnsupportedFormat(format) => assert_eq!(format, "unsupported_type"),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_lcov_is_recognized_but_not_implemented() {
        let processor = CoverageProcessor::new("cov.info", "app.py", "lcov");
        let err = processor.parse().await.unwrap_err();
        match err {
            CoverageError::NotImplemented(format) => assert_eq!(format, "lcov"),
            other => panic!("expected NotImplemented, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_process_rejects_stale_report_before_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("coverage.xml");
        // Deliberately unparsable: the freshness guard must fire first.
        std::fs::write(&report, "garbage").unwrap();

        let processor = CoverageProcessor::new(&report, "app.py", "cobertura");
        let err = processor.process(i64::MAX).await.unwrap_err();
        assert!(matches!(err, CoverageError::ReportStale { .. }));
    }
}
