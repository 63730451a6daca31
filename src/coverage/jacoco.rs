//! JaCoCo aggregate parsing.
//!
//! JaCoCo's CSV export keys rows by package and class rather than by file,
//! so the `(package, class)` pair is first derived from the declarations
//! in the Java source itself.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::domain::errors::CoverageError;
use crate::domain::models::CoverageResult;

static PACKAGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*package\s+([\w.]+)\s*;").unwrap());
static CLASS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*public\s+class\s+(\w+)").unwrap());

/// Parse a JaCoCo CSV report for `source_path`.
///
/// Only aggregate counts are available at this granularity, so the line
/// vectors of the result are always empty.
pub async fn parse(
    report_path: &Path,
    source_path: &Path,
) -> Result<CoverageResult, CoverageError> {
    let source = tokio::fs::read_to_string(source_path)
        .await
        .map_err(|source| CoverageError::Io { path: source_path.to_path_buf(), source })?;
    let (package, class) = extract_package_and_class(&source)
        .ok_or_else(|| CoverageError::IdentifierNotFound(source_path.to_path_buf()))?;

    let report = tokio::fs::read_to_string(report_path)
        .await
        .map_err(|source| CoverageError::Io { path: report_path.to_path_buf(), source })?;
    let (missed, covered) = scan_rows(&report, &package, &class)?;

    Ok(CoverageResult::from_counts(missed, covered))
}

/// First package declaration and first public class declaration, in file
/// order, short-circuiting once both are found.
fn extract_package_and_class(source: &str) -> Option<(String, String)> {
    let mut package = None;
    let mut class = None;

    for line in source.lines() {
        if package.is_none() {
            if let Some(captures) = PACKAGE_PATTERN.captures(line) {
                package = Some(captures[1].to_string());
            }
        }
        if class.is_none() {
            if let Some(captures) = CLASS_PATTERN.captures(line) {
                class = Some(captures[1].to_string());
            }
        }
        if package.is_some() && class.is_some() {
            break;
        }
    }

    Some((package?, class?))
}

/// Scan the CSV for rows matching the derived key and return
/// `(missed, covered)` line counts. The last matching row wins when the
/// report repeats a package/class pair; a report with no matching row
/// yields zero counts.
fn scan_rows(report: &str, package: &str, class: &str) -> Result<(u64, u64), CoverageError> {
    let mut lines = report.lines();
    let header = lines
        .next()
        .ok_or_else(|| CoverageError::MalformedReport("report is empty".to_string()))?;
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();

    let package_idx = column_index(&columns, "PACKAGE")?;
    let class_idx = column_index(&columns, "CLASS")?;
    let missed_idx = column_index(&columns, "LINE_MISSED")?;
    let covered_idx = column_index(&columns, "LINE_COVERED")?;

    let mut missed = 0u64;
    let mut covered = 0u64;

    for (row_number, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.get(package_idx).copied() == Some(package)
            && fields.get(class_idx).copied() == Some(class)
        {
            missed = parse_count(&fields, missed_idx, row_number)?;
            covered = parse_count(&fields, covered_idx, row_number)?;
        }
    }

    Ok((missed, covered))
}

fn column_index(columns: &[&str], name: &str) -> Result<usize, CoverageError> {
    columns.iter().position(|column| *column == name).ok_or_else(|| {
        CoverageError::MalformedReport(format!("report header is missing the {name} column"))
    })
}

fn parse_count(fields: &[&str], index: usize, row_number: usize) -> Result<u64, CoverageError> {
    let value = fields.get(index).ok_or_else(|| {
        CoverageError::MalformedReport(format!("row {} is truncated", row_number + 2))
    })?;
    value.parse().map_err(|_| {
        CoverageError::MalformedReport(format!(
            "row {} has a non-numeric count: {value}",
            row_number + 2
        ))
    })
}
