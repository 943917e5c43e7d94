//! Value types shared by every phase of the TDD cycle: the state machine's
//! phase enum, the handoff state persisted to git notes, and the per-cycle /
//! per-workflow result types.

use serde::{Deserialize, Serialize};

/// One of the five states a cycle can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    Plan,
    Red,
    Green,
    Refactor,
    Complete,
}

impl Phase {
    /// The phase that follows this one in the fixed cycle, or `None` for `Complete`.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Plan => Some(Phase::Red),
            Phase::Red => Some(Phase::Green),
            Phase::Green => Some(Phase::Refactor),
            Phase::Refactor => Some(Phase::Plan),
            Phase::Complete => None,
        }
    }

    /// Phases whose commit is required before the phase is considered complete.
    pub fn requires_commit(self) -> bool {
        matches!(self, Phase::Red | Phase::Green | Phase::Refactor)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Plan => "PLAN",
            Phase::Red => "RED",
            Phase::Green => "GREEN",
            Phase::Refactor => "REFACTOR",
            Phase::Complete => "COMPLETE",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestResult {
    Pass,
    Fail,
}

/// The seven-way classification of a phase failure, ordered by the
/// precedence in which the classifier checks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Timeout,
    RateLimit,
    Network,
    Compilation,
    UnexpectedPass,
    TestFailure,
    Unknown,
}

impl ErrorKind {
    pub fn description(self) -> &'static str {
        match self {
            ErrorKind::Timeout => "the command exceeded its time limit",
            ErrorKind::RateLimit => "the model provider is rate-limiting requests",
            ErrorKind::Network => "a network error occurred talking to the model provider",
            ErrorKind::Compilation => "the code does not compile",
            ErrorKind::UnexpectedPass => {
                "the test you wrote already passes; it must fail before implementation"
            }
            ErrorKind::TestFailure => "one or more tests failed",
            ErrorKind::Unknown => "an unclassified error occurred",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetails {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

impl ErrorDetails {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind: format!("{kind:?}").to_ascii_uppercase(),
            message: message.into(),
        }
    }

    pub fn abort(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind: format!("ABORT_{kind:?}").to_ascii_uppercase(),
            message: message.into(),
        }
    }
}

/// A single test the planner has selected for a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub description: String,
    #[serde(rename = "testFile")]
    pub test_file: String,
    #[serde(rename = "implFile")]
    pub impl_file: String,
}

impl TestCase {
    /// Validates the non-empty invariants spec'd for a TestCase.
    pub fn validate(&self) -> Result<(), String> {
        if self.description.trim().is_empty() {
            return Err("test case description must not be blank".into());
        }
        if self.test_file.trim().is_empty() {
            return Err("test case testFile must not be blank".into());
        }
        if self.impl_file.trim().is_empty() {
            return Err("test case implFile must not be blank".into());
        }
        Ok(())
    }
}

/// The durable, git-notes-backed handoff between phases.
///
/// Every field here round-trips through JSON byte-for-byte; the JSON key
/// names below are the wire contract, not just a serde convenience.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffState {
    pub phase: Phase,
    #[serde(rename = "nextPhase")]
    pub next_phase: Option<Phase>,
    #[serde(rename = "cycleNumber")]
    pub cycle_number: u32,
    #[serde(rename = "currentTest")]
    pub current_test: Option<TestCase>,
    #[serde(rename = "completedTests")]
    pub completed_tests: Vec<String>,
    #[serde(rename = "pendingTests")]
    pub pending_tests: Vec<String>,
    #[serde(rename = "testResult")]
    pub test_result: Option<TestResult>,
    pub error: Option<String>,
    #[serde(rename = "errorDetails")]
    pub error_details: Option<ErrorDetails>,
    #[serde(rename = "retryCount")]
    pub retry_count: u32,
}

impl HandoffState {
    /// The initial state a fresh `run` begins with.
    pub fn initial(pending_tests: Vec<String>) -> Self {
        Self {
            phase: Phase::Plan,
            next_phase: Some(Phase::Red),
            cycle_number: 1,
            current_test: None,
            completed_tests: Vec::new(),
            pending_tests,
            test_result: None,
            error: None,
            error_details: None,
            retry_count: 0,
        }
    }

    /// Clears retry/error bookkeeping after a phase succeeds.
    pub fn clear_error(&mut self) {
        self.retry_count = 0;
        self.error = None;
        self.error_details = None;
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }
}

/// One agent role's fixed configuration: system prompt, tool capability set,
/// and model identifier. Constructed once per role at startup.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub name: String,
    pub description: String,
    pub system_prompt: String,
    /// Names of the tools (from the fixed six-tool dispatcher) this role may call.
    pub tool_names: Vec<&'static str>,
    pub model: String,
}

/// Outcome of a single PLAN→RED→GREEN→REFACTOR cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleResult {
    #[serde(rename = "cycleNumber")]
    pub cycle_number: u32,
    #[serde(rename = "testDescription")]
    pub test_description: String,
    pub success: bool,
    #[serde(rename = "commitIds")]
    pub commit_ids: Vec<String>,
    pub error: Option<String>,
}

/// The final, user-facing outcome of a full workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    #[serde(rename = "featureRequest")]
    pub feature_request: String,
    pub success: bool,
    pub cycles: Vec<CycleResult>,
    #[serde(rename = "totalTests")]
    pub total_tests: usize,
    #[serde(rename = "startedAt")]
    pub started_at: String,
    #[serde(rename = "endedAt")]
    pub ended_at: String,
    #[serde(rename = "finalState")]
    pub final_state: HandoffState,
    pub error: Option<String>,
}
