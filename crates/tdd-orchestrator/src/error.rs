//! Top-level error type unifying every fallible collaborator this crate
//! drives, mapped to CLI exit codes (§6, §10.2).
//!
//! Exit codes: 0 success, 1 runtime/workflow failure, 2 configuration error,
//! 3 I/O or notes error.

use tdd_core::agent::AgentError;
use tdd_core::{GitError, NotesError};

use crate::config::ConfigError;
use crate::planner::PlannerParseError;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Notes(#[from] NotesError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    PlannerParse(#[from] PlannerParseError),

    #[error("workflow aborted: {0}")]
    Aborted(String),

    #[error("no handoff state found; run `tdd run` first")]
    NoHandoffState,
}

impl OrchestratorError {
    /// The exit code this error should produce at the process boundary.
    pub fn exit_code(&self) -> i32 {
        match self {
            OrchestratorError::Config(_) => 2,
            OrchestratorError::Notes(_) => 3,
            OrchestratorError::Git(GitError::Spawn(_)) => 3,
            OrchestratorError::Git(_) => 1,
            OrchestratorError::Agent(_)
            | OrchestratorError::PlannerParse(_)
            | OrchestratorError::Aborted(_)
            | OrchestratorError::NoHandoffState => 1,
        }
    }

    /// A human recovery instruction to print alongside the error, following
    /// the same "{error}\n\nRecovery: {hint}" shape as the other components.
    pub fn recovery_hint(&self) -> String {
        match self {
            OrchestratorError::Config(e) => e.recovery_hint(),
            OrchestratorError::Git(e) => e.recovery_hint().to_string(),
            OrchestratorError::Notes(e) => e.recovery_hint().to_string(),
            OrchestratorError::Agent(_) => {
                "check the model provider's status and your API key, then retry".to_string()
            }
            OrchestratorError::PlannerParse(_) => {
                "the planner's reply did not contain a valid `currentTest` block; check its \
                 system prompt and retry"
                    .to_string()
            }
            OrchestratorError::Aborted(_) => {
                "inspect `tdd history` for the failing commit and repair manually before \
                 resuming"
                    .to_string()
            }
            OrchestratorError::NoHandoffState => {
                "run `tdd run \"<feature request>\"` to start a workflow".to_string()
            }
        }
    }

    /// Render as the operator-facing two-line message this codebase uses for
    /// every fatal CLI error.
    pub fn render(&self) -> String {
        format!("{self}\n\nRecovery: {}", self.recovery_hint())
    }
}
