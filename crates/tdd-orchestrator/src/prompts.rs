//! Phase-specific user-prompt assembly (§4.4). Builds the final prompt by
//! appending titled markdown sections in a fixed order, the same
//! section-accumulation style the teacher uses for its own task prompts,
//! rather than reaching for a template engine.

use tdd_core::model::{ErrorDetails, ErrorKind, HandoffState, Phase, TestCase};

const TEST_LIST_CONVENTION: &str = "\
## Test list convention
`test-list.md` at the project root tracks every planned test as a markdown checkbox: \
`- [ ] description` for pending, `- [x] description` for completed.";

/// Assemble the full prompt for `phase`, given the current handoff `state`.
/// When `state.retry_count > 0` a "Previous Attempt Failed" section is
/// appended describing the prior failure and phase-specific guidance.
/// `test_command` is the detected (or configured) command for running the
/// project's test suite — RED/GREEN/REFACTOR must run it themselves via
/// the Bash tool; the orchestrator classifies their outcome from that same
/// Bash call rather than running it independently (§4.5, §4.6).
pub fn build(phase: Phase, state: &HandoffState, max_retries: u32, test_command: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str(&role_preamble(phase));
    prompt.push('\n');
    prompt.push_str(&phase_body(phase, state, test_command));
    prompt.push('\n');
    prompt.push_str(TEST_LIST_CONVENTION);

    if state.retry_count > 0 {
        prompt.push('\n');
        prompt.push_str(&retry_block(phase, state, max_retries));
    }

    prompt
}

fn role_preamble(phase: Phase) -> String {
    let role = match phase {
        Phase::Plan => "planner",
        Phase::Red => "RED",
        Phase::Green => "GREEN",
        Phase::Refactor => "REFACTOR",
        Phase::Complete => "",
    };
    format!("## Role\nYou are acting as the {role} agent for this cycle.")
}

fn phase_body(phase: Phase, state: &HandoffState, test_command: &str) -> String {
    match phase {
        Phase::Plan => {
            let mut body = String::from(
                "## Task\nDetermine the next test to implement for the requested feature. \
                 Select the first unchecked entry in `test-list.md`, creating the file first \
                 if it does not exist.",
            );
            if !state.pending_tests.is_empty() {
                body.push_str("\n\nPending tests, in order:\n");
                for test in &state.pending_tests {
                    body.push_str(&format!("- {test}\n"));
                }
            }
            body
        }
        Phase::Red => format!(
            "## Task\nWrite one failing test for:\n{}\n\nRun the test suite yourself via the \
             Bash tool (`{test_command}`) as your last tool call before ending your turn, and \
             confirm only your new test fails.",
            render_test_case(state.current_test.as_ref())
        ),
        Phase::Green => format!(
            "## Task\nMake this failing test pass with the minimum implementation:\n{}\n\nRun \
             the test suite yourself via the Bash tool (`{test_command}`) as your last tool \
             call before ending your turn, and confirm the full suite passes.",
            render_test_case(state.current_test.as_ref())
        ),
        Phase::Refactor => format!(
            "## Task\nClean up the implementation for:\n{}\n\nRun the test suite yourself via \
             the Bash tool (`{test_command}`) as your last tool call before ending your turn, \
             and confirm it is still entirely green.",
            render_test_case(state.current_test.as_ref())
        ),
        Phase::Complete => String::new(),
    }
}

fn render_test_case(test_case: Option<&TestCase>) -> String {
    match test_case {
        Some(test_case) => format!(
            "- description: {}\n- testFile: {}\n- implFile: {}",
            test_case.description, test_case.test_file, test_case.impl_file
        ),
        None => "(no test case selected)".to_string(),
    }
}

fn retry_block(phase: Phase, state: &HandoffState, max_retries: u32) -> String {
    let mut block = format!(
        "## Previous Attempt Failed\nAttempt {} of {}.\n",
        state.retry_count, max_retries
    );

    if let Some(details) = &state.error_details {
        block.push_str(&format!("Error kind: {}\n", details.kind));
    }
    if let Some(error) = &state.error {
        block.push_str(&format!("Error detail:\n```\n{error}\n```\n"));
    }

    block.push_str(&format!("Guidance: {}", guidance(phase, state.error_details.as_ref())));
    block
}

fn guidance(phase: Phase, error_details: &Option<ErrorDetails>) -> &'static str {
    let kind = error_details
        .as_ref()
        .and_then(|details| parse_kind(&details.kind));

    match (phase, kind) {
        (Phase::Red, Some(ErrorKind::UnexpectedPass)) => {
            "add a proper assertion that fails until the feature is implemented."
        }
        (Phase::Red, _) => {
            "write exactly one new test, do not touch implementation code, and verify it is the \
             only failure."
        }
        (Phase::Green, Some(ErrorKind::Compilation)) => {
            "fix the compilation error first, then re-run the full suite before committing."
        }
        (Phase::Green, _) => {
            "make the minimum implementation change needed; do not modify the test."
        }
        (Phase::Refactor, _) => {
            "revert whatever refactor change broke a test, then re-run the full suite before \
             committing."
        }
        (Phase::Plan, _) => {
            "return a single JSON `currentTest` object (or `null`) and make no other changes."
        }
        (Phase::Complete, _) => "",
    }
}

fn parse_kind(raw: &str) -> Option<ErrorKind> {
    let name = raw.strip_prefix("ABORT_").unwrap_or(raw);
    match name {
        "TIMEOUT" => Some(ErrorKind::Timeout),
        "RATE_LIMIT" => Some(ErrorKind::RateLimit),
        "NETWORK" => Some(ErrorKind::Network),
        "COMPILATION" => Some(ErrorKind::Compilation),
        "UNEXPECTED_PASS" => Some(ErrorKind::UnexpectedPass),
        "TEST_FAILURE" => Some(ErrorKind::TestFailure),
        "UNKNOWN" => Some(ErrorKind::Unknown),
        _ => None,
    }
}
