//! Turns a phase's failing Bash output (and any invocation exception) into
//! an [`ErrorKind`], and turns `{ErrorKind, Phase, retryCount}` into a
//! [`RecoveryAction`] — both as ordered precedence chains of guard checks,
//! matching this codebase's existing escalation-trigger style rather than
//! a table-driven or free-for-all regex dispatch (§4.6).

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{ErrorDetails, ErrorKind, HandoffState, Phase};

static COMPILATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\[ERROR\].*\.java:\d+|cannot find symbol|COMPILATION ERROR|error TS\d{4,}|\
SyntaxError|IndentationError|ImportError|ModuleNotFoundError|\
compilation failed|syntax error|parse error|compile error)",
    )
    .expect("COMPILATION_PATTERN regex should compile")
});

static TEST_FAILURE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(Tests run:.*Failures:\s*[1-9]|FAILED|AssertionError|\
\d+ failing|\d+ passed,\s*[1-9]\d*\s*failed|FAIL(ED)?\b)",
    )
    .expect("TEST_FAILURE_PATTERN regex should compile")
});

static ALL_TESTS_PASSED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(Tests run:.*Failures:\s*0|BUILD SUCCESS|\d+ passed(?:,\s*0 failed)?\b|ok\.\s*$)",
    )
    .expect("ALL_TESTS_PASSED_PATTERN regex should compile")
});

static RATE_LIMIT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(rate limit|\b429\b)").expect("RATE_LIMIT_PATTERN regex should compile"));

static NETWORK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(network|connection)").expect("NETWORK_PATTERN regex should compile"));

static TIMEOUT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)timed out").expect("TIMEOUT_PATTERN regex should compile"));

/// True if `output` looks like a clean test run: the all-tests-passed
/// marker fires and neither the test-failure nor compilation pattern does.
/// Used by the phase executor to decide GREEN/REFACTOR success independent
/// of classify()'s RED-gated UNEXPECTED_PASS rule.
pub fn tests_passed(output: &str) -> bool {
    ALL_TESTS_PASSED_PATTERN.is_match(output)
        && !TEST_FAILURE_PATTERN.is_match(output)
        && !COMPILATION_PATTERN.is_match(output)
}

/// Classify the most recent Bash output and any invocation exception
/// message into one of the seven [`ErrorKind`]s, per the ordered rules
/// in §4.6. `phase` matters only for rule 5 (UNEXPECTED_PASS is RED-only).
pub fn classify(bash_output: &str, exception: Option<&str>, phase: Phase) -> ErrorKind {
    if let Some(ex) = exception {
        if TIMEOUT_PATTERN.is_match(ex) {
            return ErrorKind::Timeout;
        }
        if RATE_LIMIT_PATTERN.is_match(ex) {
            return ErrorKind::RateLimit;
        }
        if NETWORK_PATTERN.is_match(ex) {
            return ErrorKind::Network;
        }
    }
    if TIMEOUT_PATTERN.is_match(bash_output) {
        return ErrorKind::Timeout;
    }
    if COMPILATION_PATTERN.is_match(bash_output) {
        return ErrorKind::Compilation;
    }
    if phase == Phase::Red
        && ALL_TESTS_PASSED_PATTERN.is_match(bash_output)
        && !TEST_FAILURE_PATTERN.is_match(bash_output)
        && !COMPILATION_PATTERN.is_match(bash_output)
    {
        return ErrorKind::UnexpectedPass;
    }
    if TEST_FAILURE_PATTERN.is_match(bash_output) {
        return ErrorKind::TestFailure;
    }
    ErrorKind::Unknown
}

/// What the orchestrator should do next, given the classified error,
/// the phase it occurred in, and how many retries this phase has already
/// taken, per the decision table in §4.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Expected outcome (a RED-phase test failure); proceed normally.
    Continue,
    /// Increment retryCount, stash a truncated error extract, retry the phase.
    RetryWithContext,
    /// Hard reset to the phase's pre-commit HEAD, then retry.
    RollbackAndRetry,
    /// Sleep on the exponential backoff schedule, then retry.
    WaitAndRetry,
    /// Give up; record an ABORT_-prefixed error and end the workflow.
    Abort,
}

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Backoff schedule in seconds for WAIT_AND_RETRY, clamped to its last entry.
const BACKOFF_SCHEDULE_SECS: [u64; 3] = [1, 2, 4];

pub fn backoff_delay_secs(retry_count: u32) -> u64 {
    let idx = (retry_count as usize).min(BACKOFF_SCHEDULE_SECS.len() - 1);
    BACKOFF_SCHEDULE_SECS[idx]
}

/// Decide the recovery action for a classified error, per the ordered
/// table in §4.6. `retryCount >= maxRetries` always wins, checked first.
pub fn decide(kind: ErrorKind, phase: Phase, retry_count: u32, max_retries: u32) -> RecoveryAction {
    if retry_count >= max_retries {
        return RecoveryAction::Abort;
    }
    match (kind, phase) {
        (ErrorKind::Compilation, _) => RecoveryAction::RetryWithContext,
        (ErrorKind::TestFailure, Phase::Red) => RecoveryAction::Continue,
        (ErrorKind::TestFailure, Phase::Green | Phase::Refactor) => RecoveryAction::RollbackAndRetry,
        (ErrorKind::TestFailure, _) => RecoveryAction::RetryWithContext,
        (ErrorKind::UnexpectedPass, _) => RecoveryAction::RetryWithContext,
        (ErrorKind::Timeout | ErrorKind::Network | ErrorKind::RateLimit, _) => {
            RecoveryAction::WaitAndRetry
        }
        (ErrorKind::Unknown, _) => RecoveryAction::RetryWithContext,
    }
}

/// Extract a ≤500-char excerpt from `output`, favoring lines that look like
/// the actual failure (containing "error", "failure", or "Exception"),
/// falling back to the last few non-empty lines when nothing matches.
pub fn truncate_error_excerpt(output: &str) -> String {
    const MAX_LEN: usize = 500;

    let relevant: Vec<&str> = output
        .lines()
        .filter(|l| {
            let lower = l.to_ascii_lowercase();
            lower.contains("error") || lower.contains("failure") || lower.contains("exception")
        })
        .collect();

    let chosen: Vec<&str> = if !relevant.is_empty() {
        relevant
    } else {
        output
            .lines()
            .filter(|l| !l.trim().is_empty())
            .rev()
            .take(5)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect()
    };

    let joined = chosen.join("\n");
    if joined.len() <= MAX_LEN {
        joined
    } else {
        let mut truncated: String = joined.chars().take(MAX_LEN).collect();
        truncated.push_str("...");
        truncated
    }
}

/// Apply RETRY_WITH_CONTEXT bookkeeping to `state` in place: increments
/// retryCount and records a truncated error extract plus errorDetails.
pub fn apply_retry_with_context(state: &mut HandoffState, kind: ErrorKind, bash_output: &str) {
    state.retry_count += 1;
    let excerpt = truncate_error_excerpt(bash_output);
    state.error = Some(excerpt.clone());
    state.error_details = Some(ErrorDetails::new(kind, excerpt));
}

/// Apply ABORT bookkeeping: records a final error whose `type` is prefixed
/// `ABORT_`, per §4.6.
pub fn apply_abort(state: &mut HandoffState, kind: ErrorKind, bash_output: &str) {
    let excerpt = truncate_error_excerpt(bash_output);
    state.error = Some(excerpt.clone());
    state.error_details = Some(ErrorDetails::abort(kind, excerpt));
}
