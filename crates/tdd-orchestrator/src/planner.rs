//! Parses the PLAN phase's reply for a `currentTest` JSON object (§4.5 step
//! 4), tolerating fenced code blocks, inline JSON, and extra fields/whitespace.

use tdd_core::model::TestCase;

#[derive(Debug, thiserror::Error)]
pub enum PlannerParseError {
    #[error("no `currentTest` JSON object found in the planner's reply")]
    NotFound,

    #[error("`currentTest` is not a valid test case: {0}")]
    InvalidTestCase(String),
}

/// Extract the planner's selection from its reply text. `Ok(None)` means the
/// planner reported no pending tests remain (`{"currentTest": null}`);
/// `Ok(Some(test_case))` is a validated selection.
pub fn parse_current_test(reply: &str) -> Result<Option<TestCase>, PlannerParseError> {
    let mut last_match: Option<serde_json::Value> = None;
    for candidate in json_object_candidates(reply) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&candidate) {
            if value.get("currentTest").is_some() {
                last_match = Some(value);
            }
        }
    }

    let value = last_match.ok_or(PlannerParseError::NotFound)?;
    match value.get("currentTest").expect("checked above") {
        serde_json::Value::Null => Ok(None),
        other => {
            let test_case: TestCase = serde_json::from_value(other.clone())
                .map_err(|e| PlannerParseError::InvalidTestCase(e.to_string()))?;
            test_case
                .validate()
                .map_err(PlannerParseError::InvalidTestCase)?;
            Ok(Some(test_case))
        }
    }
}

/// Scan `text` for every balanced top-level `{...}` substring — inside
/// fenced code blocks or inline — as a candidate JSON object. Deliberately
/// permissive: invalid candidates are simply skipped by the caller's parse
/// attempt rather than rejected here.
fn json_object_candidates(text: &str) -> Vec<String> {
    let mut candidates = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '{' {
            if let Some(end) = matching_brace(&chars, i) {
                candidates.push(chars[i..=end].iter().collect());
                i = end + 1;
                continue;
            }
        }
        i += 1;
    }
    candidates
}

/// Find the index of the `}` that balances the `{` at `start`, respecting
/// string literals so braces inside quoted strings don't confuse the count.
fn matching_brace(chars: &[char], start: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &c) in chars.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
