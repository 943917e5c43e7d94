//! Routes a tool-use request (by name) to exactly one of the six executors.

use std::path::PathBuf;
use std::time::Duration;

use rig::completion::ToolDefinition;
use rig::tool::Tool as _;
use serde_json::Value;

use super::{BashTool, EditTool, GlobTool, GrepTool, ReadTool, ToolError, ToolOutcome, WriteTool};

/// Constructs and owns the six tool executors for one project root, and
/// dispatches tool-use requests to them by name.
pub struct ToolDispatcher {
    read: ReadTool,
    write: WriteTool,
    edit: EditTool,
    bash: BashTool,
    glob: GlobTool,
    grep: GrepTool,
}

impl ToolDispatcher {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let root = project_root.into();
        Self {
            read: ReadTool::new(root.clone()),
            write: WriteTool::new(root.clone()),
            edit: EditTool::new(root.clone()),
            bash: BashTool::new(root.clone()),
            glob: GlobTool::new(root.clone()),
            grep: GrepTool::new(root),
        }
    }

    pub fn with_bash_timeout(mut self, timeout: Duration) -> Self {
        self.bash = self.bash.with_timeout(timeout);
        self
    }

    /// Tool definitions for every registered tool, in dispatcher registration
    /// order, for handing to the LLM request (§4.3 step 1).
    pub async fn tool_definitions(&self) -> Vec<ToolDefinition> {
        vec![
            self.read.definition(String::new()).await,
            self.write.definition(String::new()).await,
            self.edit.definition(String::new()).await,
            self.bash.definition(String::new()).await,
            self.glob.definition(String::new()).await,
            self.grep.definition(String::new()).await,
        ]
    }

    /// Execute the named tool with JSON args. Never returns an `Err` that
    /// should propagate past the invoker: unknown-tool and argument-shape
    /// failures are folded into a failing [`ToolOutcome`] just like executor
    /// errors are (§4.1's dispatcher contract).
    pub async fn dispatch(&self, name: &str, args: Value) -> ToolOutcome {
        match name {
            "Read" => Self::run(args, |a| self.read.run(&a)),
            "Write" => Self::run(args, |a| self.write.run(&a)),
            "Edit" => Self::run(args, |a| self.edit.run(&a)),
            "Glob" => Self::run(args, |a| self.glob.run(&a)),
            "Grep" => Self::run(args, |a| self.grep.run(&a)),
            "Bash" => match serde_json::from_value(args) {
                Ok(parsed) => ToolOutcome::from_result(self.bash.run(&parsed).await),
                Err(e) => ToolOutcome::err(format!("invalid arguments for Bash: {e}")),
            },
            other => ToolOutcome::err(ToolError::UnknownTool(other.to_string()).to_string()),
        }
    }

    fn run<A, F>(args: Value, f: F) -> ToolOutcome
    where
        A: serde::de::DeserializeOwned,
        F: FnOnce(A) -> Result<String, ToolError>,
    {
        match serde_json::from_value::<A>(args) {
            Ok(parsed) => ToolOutcome::from_result(f(parsed)),
            Err(e) => ToolOutcome::err(format!("invalid arguments: {e}")),
        }
    }
}
