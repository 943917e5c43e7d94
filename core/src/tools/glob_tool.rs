//! Glob tool: brace-expanding, `**`-aware file pattern matching.

use std::path::PathBuf;

use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::Deserialize;

use super::{is_skipped_dir, resolve_path, ToolError};

#[derive(Debug, Deserialize)]
pub struct GlobArgs {
    pub pattern: String,
    pub path: Option<String>,
}

pub struct GlobTool {
    pub project_root: PathBuf,
}

impl GlobTool {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    pub fn run(&self, args: &GlobArgs) -> Result<String, ToolError> {
        let root = match &args.path {
            Some(p) => resolve_path(&self.project_root, p),
            None => self.project_root.clone(),
        };
        if !root.exists() {
            return Err(ToolError::MissingPath(
                args.path.clone().unwrap_or_else(|| ".".into()),
            ));
        }

        let mut matches = std::collections::BTreeSet::new();
        for expanded in expand_braces(&args.pattern) {
            let full_pattern = root.join(&expanded);
            let full_pattern_str = full_pattern.to_string_lossy().into_owned();
            let paths = glob::glob(&full_pattern_str)
                .map_err(|e| ToolError::InvalidRegex(e.to_string()))?;
            for entry in paths.flatten() {
                if path_is_skipped(&root, &entry) {
                    continue;
                }
                matches.insert(entry);
            }
        }

        if matches.is_empty() {
            return Ok("No matches found".into());
        }

        let lines: Vec<String> = matches
            .into_iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        Ok(lines.join("\n"))
    }
}

/// True if any path component between `root` and `candidate` is a hidden or
/// build directory that Glob/Grep should never descend into.
fn path_is_skipped(root: &std::path::Path, candidate: &std::path::Path) -> bool {
    candidate
        .strip_prefix(root)
        .unwrap_or(candidate)
        .components()
        .any(|c| {
            c.as_os_str()
                .to_str()
                .map(is_skipped_dir)
                .unwrap_or(false)
        })
}

/// Expand a single level of brace alternation, e.g. `src/*.{rs,toml}` →
/// `["src/*.rs", "src/*.toml"]`. Patterns without braces expand to themselves.
/// Nested braces are not supported (not needed by this tool's callers).
pub fn expand_braces(pattern: &str) -> Vec<String> {
    if let (Some(open), Some(close)) = (pattern.find('{'), pattern.rfind('}')) {
        if open < close {
            let prefix = &pattern[..open];
            let body = &pattern[open + 1..close];
            let suffix = &pattern[close + 1..];
            return body
                .split(',')
                .map(|alt| format!("{prefix}{alt}{suffix}"))
                .collect();
        }
    }
    vec![pattern.to_string()]
}

impl Tool for GlobTool {
    const NAME: &'static str = "Glob";
    type Error = ToolError;
    type Args = GlobArgs;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: "Glob".into(),
            description: "Find files matching a glob pattern (supports `**` and brace \
                          expansion like `{rs,toml}`). Hidden and build directories are \
                          skipped."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "pattern": {
                        "type": "string",
                        "description": "Glob pattern, e.g. '**/*.rs' or 'src/*.{rs,toml}'"
                    },
                    "path": {
                        "type": "string",
                        "description": "Directory to root the search at (defaults to the project root)"
                    }
                },
                "required": ["pattern"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        self.run(&args)
    }
}
