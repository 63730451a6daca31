//! Static HTML rendering of the run's validation outcomes.

use async_trait::async_trait;
use std::path::Path;

use crate::domain::models::{ValidationOutcome, ValidationStatus};
use crate::domain::ports::ReportSink;

const HTML_HEADER: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Test Results</title>
    <style>
        body {
            font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
            margin: 20px;
        }
        table {
            border-collapse: collapse;
            width: 100%;
            box-shadow: 0 2px 3px rgba(0,0,0,0.1);
        }
        th, td {
            border: 1px solid #ddd;
            text-align: left;
            padding: 8px;
        }
        th {
            background-color: #f2f2f2;
        }
        tr:nth-child(even) {
            background-color: #f9f9f9;
        }
        .status-pass {
            color: green;
        }
        .status-fail {
            color: red;
        }
        pre {
            background-color: #000000;
            color: #ffffff;
            padding: 5px;
            border-radius: 5px;
            white-space: pre-wrap;
        }
    </style>
</head>
<body>
    <table>
        <tr>
            <th>Status</th>
            <th>Reason</th>
            <th>Exit Code</th>
            <th>Stderr</th>
            <th>Stdout</th>
            <th>Test</th>
        </tr>
"#;

const HTML_FOOTER: &str = "    </table>\n</body>\n</html>\n";

/// Writes the outcome table as a standalone HTML page.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlReportSink;

#[async_trait]
impl ReportSink for HtmlReportSink {
    async fn write(&self, outcomes: &[ValidationOutcome], path: &Path) -> std::io::Result<()> {
        tokio::fs::write(path, render(outcomes)).await
    }
}

fn render(outcomes: &[ValidationOutcome]) -> String {
    let mut html = String::from(HTML_HEADER);
    for outcome in outcomes {
        html.push_str(&render_row(outcome));
    }
    html.push_str(HTML_FOOTER);
    html
}

fn render_row(outcome: &ValidationOutcome) -> String {
    let status = match outcome.status {
        ValidationStatus::Pass => "pass",
        ValidationStatus::Fail => "fail",
    };
    let reason = outcome
        .reason
        .map_or_else(String::new, |reason| escape_html(&reason.to_string()));

    format!(
        "        <tr>\n\
         \x20           <td class=\"status-{status}\">{status}</td>\n\
         \x20           <td>{reason}</td>\n\
         \x20           <td>{exit_code}</td>\n\
         \x20           <td>{stderr}</td>\n\
         \x20           <td>{stdout}</td>\n\
         \x20           <td>{test}</td>\n\
         \x20       </tr>\n",
        exit_code = outcome.exit_code,
        stderr = preformatted(&outcome.stderr),
        stdout = preformatted(&outcome.stdout),
        test = preformatted(&outcome.test_code),
    )
}

fn preformatted(text: &str) -> String {
    if text.is_empty() {
        "&nbsp;".to_string()
    } else {
        format!("<pre><code>{}</code></pre>", escape_html(text))
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
