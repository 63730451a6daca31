//! Terminal rendering of run results.

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};

use crate::domain::models::{ValidationOutcome, ValidationStatus};

/// Render the outcome list as a terminal table, one row per candidate.
pub fn render_outcome_table(outcomes: &[ValidationOutcome]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Status", "Reason", "Exit", "Test"]);

    for (index, outcome) in outcomes.iter().enumerate() {
        let status_cell = match outcome.status {
            ValidationStatus::Pass => Cell::new("pass").fg(Color::Green),
            ValidationStatus::Fail => Cell::new("fail").fg(Color::Red),
        };
        let reason = outcome
            .reason
            .map_or_else(String::new, |reason| reason.to_string());

        table.add_row(vec![
            Cell::new(index + 1),
            status_cell,
            Cell::new(reason),
            Cell::new(outcome.exit_code),
            Cell::new(first_line(&outcome.test_code, 60)),
        ]);
    }

    table
}

/// First line of the test, truncated so the table stays readable.
fn first_line(text: &str, max_chars: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() <= max_chars {
        line.to_string()
    } else {
        let truncated: String = line.chars().take(max_chars).collect();
        format!("{truncated}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::FailureReason;

    #[test]
    fn test_first_line_truncation() {
        assert_eq!(first_line("short", 10), "short");
        assert_eq!(first_line("def test_a():\n    pass", 60), "def test_a():");
        let long = "x".repeat(80);
        assert_eq!(first_line(&long, 60).chars().count(), 61);
    }

    #[test]
    fn test_table_has_one_row_per_outcome() {
        let outcomes = vec![
            ValidationOutcome::pass(0, "", "", "def test_a(): pass"),
            ValidationOutcome::fail(FailureReason::BuildError, 2, "", "err", "def test_b(): x"),
        ];
        let table = render_outcome_table(&outcomes);
        let rendered = table.to_string();
        assert!(rendered.contains("def test_a(): pass"));
        assert!(rendered.contains("build error"));
    }
}
