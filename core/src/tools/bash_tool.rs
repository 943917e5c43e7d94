//! Bash tool: runs a command through the system shell with a global timeout.

use std::path::PathBuf;
use std::time::Duration;

use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::Deserialize;
use tracing::debug;

use super::ToolError;

/// Default wall-clock timeout for a single Bash invocation, matching
/// `bash.timeout` in `tdd.properties` (§10.3).
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Deserialize)]
pub struct BashArgs {
    pub command: String,
}

pub struct BashTool {
    pub project_root: PathBuf,
    pub timeout: Duration,
}

impl BashTool {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `command` via `sh -c`, merging stdout and stderr. The child is
    /// forcibly killed if it outruns `self.timeout`; the timeout error
    /// message always contains the literal substring "timed out" so the
    /// error classifier can recognize it (§4.6 rule 1).
    pub async fn run(&self, args: &BashArgs) -> Result<String, ToolError> {
        let mut child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&args.command)
            .current_dir(&self.project_root)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let wait = child.wait_with_output();

        let output = match tokio::time::timeout(self.timeout, wait).await {
            Ok(result) => result?,
            Err(_) => {
                debug!(command = %args.command, timeout_secs = self.timeout.as_secs(), "Bash: timed out");
                return Err(ToolError::Timeout(self.timeout.as_secs()));
            }
        };

        let mut merged = String::from_utf8_lossy(&output.stdout).into_owned();
        merged.push_str(&String::from_utf8_lossy(&output.stderr));

        match output.status.code() {
            Some(0) => Ok(merged),
            Some(code) => {
                debug!(code, command = %args.command, "Bash: nonzero exit");
                Err(ToolError::CommandFailed { code, output: merged })
            }
            None => {
                debug!(command = %args.command, "Bash: terminated by signal");
                Err(ToolError::CommandFailed { code: -1, output: merged })
            }
        }
    }
}

impl Tool for BashTool {
    const NAME: &'static str = "Bash";
    type Error = ToolError;
    type Args = BashArgs;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: "Bash".into(),
            description: format!(
                "Run a command via the system shell in the project root. Stdout and stderr are \
                 merged. Times out after {}s.",
                self.timeout.as_secs()
            ),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "The shell command to run"
                    }
                },
                "required": ["command"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        self.run(&args).await
    }
}
