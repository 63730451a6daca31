//! Decoding model responses into test candidates.
//!
//! The model is asked for YAML but does not always comply. Decoding is an
//! explicit fallback chain of pure repair passes, tried in order; only
//! when every pass fails does the round degrade to zero candidates.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::models::TestCandidate;

/// Top-level structure the model is asked to produce.
#[derive(Debug, Default, Deserialize)]
struct GeneratedTests {
    #[serde(default)]
    new_tests: Vec<TestCandidate>,
    #[serde(default)]
    language: Option<String>,
}

/// Keys whose values the model frequently emits as unquoted multiline
/// blocks missing their block-scalar marker.
const BLOCK_SCALAR_KEYS: &[&str] = &["test_code", "new_imports_code"];

/// Decode a model response into candidates.
///
/// Returns an empty vector when every parse and repair pass fails; the
/// caller logs the miss and treats the round as a no-op rather than a
/// fatal error.
pub fn decode_candidates(response: &str) -> Vec<TestCandidate> {
    let stripped = strip_fences(response);

    let passes: &[(&str, fn(&str) -> Option<GeneratedTests>)] = &[
        ("direct", parse_direct),
        ("block_scalars", parse_with_block_scalars),
        ("fenced_snippet", parse_fenced_snippet),
        ("strip_braces", parse_without_braces),
        ("drop_tail", parse_dropping_tail),
    ];

    for (name, pass) in passes {
        if let Some(parsed) = pass(&stripped) {
            if *name != "direct" {
                debug!(pass = name, "recovered candidates after YAML repair");
            }
            return parsed.new_tests;
        }
    }

    warn!("could not decode model response into test candidates");
    Vec::new()
}

/// Remove a leading ```yaml fence and any trailing backticks.
fn strip_fences(response: &str) -> String {
    let trimmed = response.trim();
    let trimmed = trimmed.strip_prefix("```yaml").unwrap_or(trimmed);
    trimmed.trim_end_matches('`').trim().to_string()
}

fn parse_direct(text: &str) -> Option<GeneratedTests> {
    serde_yaml::from_str(text).ok()
}

/// Append `|-` to bare `test_code:`/`new_imports_code:` keys so the
/// indented lines below them parse as a block scalar.
fn parse_with_block_scalars(text: &str) -> Option<GeneratedTests> {
    let repaired = text
        .lines()
        .map(|line| {
            let trimmed = line.trim_end();
            for key in BLOCK_SCALAR_KEYS {
                if trimmed.ends_with(&format!("{key}:")) {
                    return format!("{trimmed} |-");
                }
            }
            line.to_string()
        })
        .collect::<Vec<_>>()
        .join("\n");
    serde_yaml::from_str(&repaired).ok()
}

/// Extract the contents of an embedded ```yaml ... ``` block.
fn parse_fenced_snippet(text: &str) -> Option<GeneratedTests> {
    let start = text.find("```yaml")? + "```yaml".len();
    let end = text[start..].find("```")? + start;
    serde_yaml::from_str(text[start..end].trim()).ok()
}

/// Remove surrounding curly braces some models wrap the document in.
fn parse_without_braces(text: &str) -> Option<GeneratedTests> {
    let inner = text.trim().strip_prefix('{')?.strip_suffix('}')?;
    serde_yaml::from_str(inner).ok()
}

/// Drop trailing lines one at a time until a usable prefix parses. A
/// prefix only counts when it actually carries tests or a language tag,
/// so degenerate fragments do not masquerade as success.
fn parse_dropping_tail(text: &str) -> Option<GeneratedTests> {
    let lines: Vec<&str> = text.lines().collect();
    for cut in 1..lines.len() {
        let head = lines[..lines.len() - cut].join("\n");
        if let Ok(parsed) = serde_yaml::from_str::<GeneratedTests>(&head) {
            if parsed.language.is_some() || !parsed.new_tests.is_empty() {
                return Some(parsed);
            }
        }
    }
    None
}
