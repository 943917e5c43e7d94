//! The six agent-facing tool primitives (Read, Write, Edit, Bash, Glob, Grep)
//! and the dispatcher that routes a tool name to its executor.
//!
//! Each primitive implements `rig::tool::Tool` directly, so the same struct
//! serves both as a dispatcher registry entry (used by the hand-rolled agent
//! loop in [`crate::agent`]) and as a tool `rig`'s own agent builder could
//! attach — there is exactly one implementation of each tool's semantics.

pub mod bash_tool;
pub mod dispatcher;
pub mod edit_tool;
pub mod glob_tool;
pub mod grep_tool;
pub mod read_tool;
pub mod write_tool;

use std::path::{Path, PathBuf};

pub use bash_tool::BashTool;
pub use edit_tool::EditTool;
pub use glob_tool::GlobTool;
pub use grep_tool::GrepTool;
pub use read_tool::ReadTool;
pub use write_tool::WriteTool;

/// Errors a tool executor can surface. Never propagates past the dispatcher
/// as a panic or unhandled exception — always converted to a [`ToolOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("not a regular file: {0}")]
    NotARegularFile(String),

    #[error("`old_string` not found in {path}")]
    NoMatch { path: String },

    #[error("`old_string` occurs {count} times in {path}; must occur exactly once")]
    AmbiguousMatch { path: String, count: usize },

    #[error("invalid regular expression: {0}")]
    InvalidRegex(String),

    #[error("path does not exist: {0}")]
    MissingPath(String),

    #[error("command timed out after {0}s")]
    Timeout(u64),

    #[error("Exit code {code}\n{output}")]
    CommandFailed { code: i32, output: String },

    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

/// The result of running a tool: a success flag plus textual output (or, on
/// failure, the error string) — the pair the invoker wraps into a tool-result
/// content block for the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    pub success: bool,
    pub output: String,
}

impl ToolOutcome {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn err(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }

    pub fn from_result(result: Result<String, ToolError>) -> Self {
        match result {
            Ok(output) => Self::ok(output),
            Err(e) => Self::err(e.to_string()),
        }
    }
}

/// Resolve a tool-supplied path string against the project root. Absolute
/// paths pass through unchanged; everything else is joined to `root`.
pub fn resolve_path(root: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    }
}

/// Directory names skipped by Glob/Grep's file walk, matching this codebase's
/// own file-walker convention of ignoring hidden directories and build output.
pub const SKIPPED_DIR_NAMES: &[&str] = &[
    "target", "node_modules", ".git", "dist", "build", "__pycache__", ".venv",
];

pub fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.') || SKIPPED_DIR_NAMES.contains(&name)
}
