//! Normalized coverage measurement produced by the report parsers.

use serde::{Deserialize, Serialize};

/// Result of parsing one coverage report, normalized across formats.
///
/// Line-level formats populate `covered_lines` and `missed_lines`; aggregate
/// formats leave both empty and only carry the percentage. Immutable once
/// produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageResult {
    /// Line numbers exercised at least once, in report order.
    pub covered_lines: Vec<u32>,
    /// Line numbers never exercised, in report order.
    pub missed_lines: Vec<u32>,
    /// Fraction of measured units exercised, in [0, 1]. Zero when the
    /// report contained nothing measurable.
    pub percentage: f64,
}

impl CoverageResult {
    /// Line-level constructor: the percentage is derived from the two
    /// buckets.
    pub fn from_lines(covered_lines: Vec<u32>, missed_lines: Vec<u32>) -> Self {
        let total = covered_lines.len() + missed_lines.len();
        let percentage = if total == 0 {
            0.0
        } else {
            covered_lines.len() as f64 / total as f64
        };
        Self { covered_lines, missed_lines, percentage }
    }

    /// Aggregate constructor: no line-level granularity is available, so
    /// the line vectors stay empty.
    pub fn from_counts(missed: u64, covered: u64) -> Self {
        let total = missed + covered;
        let percentage = if total == 0 {
            0.0
        } else {
            covered as f64 / total as f64
        };
        Self { covered_lines: Vec::new(), missed_lines: Vec::new(), percentage }
    }

    /// Human-readable rendering embedded into the next generation prompt.
    pub fn summary(&self) -> String {
        format!(
            "Lines covered: {}\nLines missed: {}\nPercentage covered: {:.2}%",
            join_lines(&self.covered_lines),
            join_lines(&self.missed_lines),
            self.percentage * 100.0
        )
    }
}

fn join_lines(lines: &[u32]) -> String {
    lines
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_lines_percentage() {
        let result = CoverageResult::from_lines(vec![1], vec![2]);
        assert_eq!(result.covered_lines, vec![1]);
        assert_eq!(result.missed_lines, vec![2]);
        assert!((result.percentage - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_from_lines_empty_is_zero() {
        let result = CoverageResult::from_lines(vec![], vec![]);
        assert!((result.percentage - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_from_counts_percentage() {
        let result = CoverageResult::from_counts(5, 10);
        assert!(result.covered_lines.is_empty());
        assert!(result.missed_lines.is_empty());
        assert!((result.percentage - 10.0 / 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_counts_zero_total() {
        let result = CoverageResult::from_counts(0, 0);
        assert!((result.percentage - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summary_rendering() {
        let result = CoverageResult::from_lines(vec![1, 3], vec![2]);
        let summary = result.summary();
        assert!(summary.contains("Lines covered: 1, 3"));
        assert!(summary.contains("Lines missed: 2"));
        assert!(summary.contains("66.67%"));
    }
}
