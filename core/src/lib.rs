//! `tdd-core` — the orchestration engine behind the TDD cycle.
//!
//! This crate owns everything that is true regardless of which agent role is
//! talking or which project is being worked on:
//!
//! - [`model`] — the value types that flow between phases (handoff state,
//!   test case, error kind, cycle/workflow results).
//! - [`tools`] — the six filesystem/shell primitives agents may call, and the
//!   dispatcher that routes a tool name to its executor.
//! - [`git`] — the repository facade and the git-notes handoff store.
//! - [`classifier`] — the ordered precedence chain that turns a failed
//!   phase's output into an [`model::ErrorKind`] and a recovery action.
//! - [`agent`] — the bounded LLM request/tool-use loop that drives one phase.
//!
//! Role-specific wiring (prompts, agent configs, the phase executor, the
//! orchestrator loop, and the operator CLI) lives in the `tdd-orchestrator`
//! binary crate, which depends on this one.

#![allow(clippy::uninlined_format_args)]

pub mod agent;
pub mod classifier;
pub mod git;
pub mod model;
pub mod tools;

pub use agent::{AgentInvoker, InvocationOutcome};
pub use classifier::{classify, tests_passed, RecoveryAction};
pub use git::notes::{NotesError, NotesManager};
pub use git::repo::{GitError, GitRepo};
pub use model::{
    AgentConfig, CycleResult, ErrorDetails, ErrorKind, HandoffState, Phase, TestCase, TestResult,
    WorkflowResult,
};
pub use tools::dispatcher::ToolDispatcher;
pub use tools::ToolError;
