//! Cobertura XML parsing.
//!
//! Per-line hit counts are nested under package -> class -> lines, with
//! each class carrying a `filename` attribute.

use std::path::Path;
use std::str::FromStr;

use crate::domain::errors::CoverageError;
use crate::domain::models::CoverageResult;

/// Parse a Cobertura report for `source_path`.
///
/// Every class whose `filename` attribute ends with the basename of the
/// source path contributes its lines (the report may store paths relative
/// to a different root, so this is a suffix match). Multiple matching
/// classes accumulate in document order; line numbers are appended as
/// encountered and never deduped.
pub async fn parse(
    report_path: &Path,
    source_path: &Path,
) -> Result<CoverageResult, CoverageError> {
    let content = tokio::fs::read_to_string(report_path)
        .await
        .map_err(|source| CoverageError::Io { path: report_path.to_path_buf(), source })?;
    let file_name = source_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    parse_document(&content, file_name)
}

fn parse_document(content: &str, source_file_name: &str) -> Result<CoverageResult, CoverageError> {
    let document = roxmltree::Document::parse(content)
        .map_err(|err| CoverageError::MalformedReport(err.to_string()))?;

    let mut covered = Vec::new();
    let mut missed = Vec::new();

    for class in document
        .descendants()
        .filter(|node| node.has_tag_name("class"))
    {
        let Some(filename) = class.attribute("filename") else {
            continue;
        };
        if !filename.ends_with(source_file_name) {
            continue;
        }

        for line in class.descendants().filter(|node| node.has_tag_name("line")) {
            let number: u32 = parse_attribute(&line, "number")?;
            let hits: u64 = parse_attribute(&line, "hits")?;
            if hits > 0 {
                covered.push(number);
            } else {
                missed.push(number);
            }
        }
    }

    Ok(CoverageResult::from_lines(covered, missed))
}

fn parse_attribute<T: FromStr>(
    node: &roxmltree::Node<'_, '_>,
    name: &str,
) -> Result<T, CoverageError> {
    let value = node.attribute(name).ok_or_else(|| {
        CoverageError::MalformedReport(format!(
            "<{}> element is missing the `{name}` attribute",
            node.tag_name().name()
        ))
    })?;
    value.parse().map_err(|_| {
        CoverageError::MalformedReport(format!(
            "<{}> element has a non-numeric `{name}` attribute: {value}",
            node.tag_name().name()
        ))
    })
}
