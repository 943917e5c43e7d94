//! Grep tool: regex search across files under a root, skipping hidden and
//! build directories.

use std::path::PathBuf;

use ignore::WalkBuilder;
use regex::Regex;
use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::Deserialize;

use super::{is_skipped_dir, resolve_path, ToolError};

#[derive(Debug, Deserialize)]
pub struct GrepArgs {
    pub pattern: String,
    pub path: Option<String>,
    pub glob: Option<String>,
}

pub struct GrepTool {
    pub project_root: PathBuf,
}

impl GrepTool {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    pub fn run(&self, args: &GrepArgs) -> Result<String, ToolError> {
        let re =
            Regex::new(&args.pattern).map_err(|e| ToolError::InvalidRegex(e.to_string()))?;
        let root = match &args.path {
            Some(p) => resolve_path(&self.project_root, p),
            None => self.project_root.clone(),
        };
        if !root.exists() {
            return Err(ToolError::MissingPath(
                args.path.clone().unwrap_or_else(|| ".".into()),
            ));
        }
        let glob_pattern = args
            .glob
            .as_ref()
            .map(|g| glob::Pattern::new(g).map_err(|e| ToolError::InvalidRegex(e.to_string())))
            .transpose()?;

        let mut hits = Vec::new();
        let walker = WalkBuilder::new(&root).hidden(true).git_ignore(true).build();
        for entry in walker.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path
                .strip_prefix(&root)
                .unwrap_or(path)
                .components()
                .any(|c| c.as_os_str().to_str().map(is_skipped_dir).unwrap_or(false))
            {
                continue;
            }
            if let Some(pat) = &glob_pattern {
                let relative = path.strip_prefix(&root).unwrap_or(path);
                if !pat.matches_path(relative) {
                    continue;
                }
            }
            let Ok(contents) = std::fs::read_to_string(path) else {
                continue; // binary or unreadable file — skip silently
            };
            for (lineno, line) in contents.lines().enumerate() {
                if re.is_match(line) {
                    hits.push(format!("{}:{}:{}", path.display(), lineno + 1, line));
                }
            }
        }

        if hits.is_empty() {
            return Ok("No matches found".into());
        }
        hits.sort();
        Ok(hits.join("\n"))
    }
}

impl Tool for GrepTool {
    const NAME: &'static str = "Grep";
    type Error = ToolError;
    type Args = GrepArgs;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: "Grep".into(),
            description: "Search file contents with a regular expression, emitting \
                          `path:line:text` per match. Hidden and build directories are \
                          skipped."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "pattern": {
                        "type": "string",
                        "description": "A regular expression"
                    },
                    "path": {
                        "type": "string",
                        "description": "Directory to search under (defaults to the project root)"
                    },
                    "glob": {
                        "type": "string",
                        "description": "Restrict the search to files matching this glob"
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
