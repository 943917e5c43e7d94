//! Edit tool: a single literal substring replacement, forced unique.

use std::path::PathBuf;

use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::Deserialize;

use super::{resolve_path, ToolError};

#[derive(Debug, Deserialize)]
pub struct EditArgs {
    pub file_path: String,
    pub old_string: String,
    pub new_string: String,
}

pub struct EditTool {
    pub project_root: PathBuf,
}

impl EditTool {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    pub fn run(&self, args: &EditArgs) -> Result<String, ToolError> {
        let path = resolve_path(&self.project_root, &args.file_path);
        let content =
            std::fs::read_to_string(&path).map_err(|_| ToolError::NotFound(args.file_path.clone()))?;

        let count = content.matches(&args.old_string).count();
        if count == 0 {
            return Err(ToolError::NoMatch {
                path: args.file_path.clone(),
            });
        }
        if count > 1 {
            return Err(ToolError::AmbiguousMatch {
                path: args.file_path.clone(),
                count,
            });
        }

        let updated = content.replacen(&args.old_string, &args.new_string, 1);
        std::fs::write(&path, &updated)?;
        Ok(format!("Edited {}", args.file_path))
    }
}

impl Tool for EditTool {
    const NAME: &'static str = "Edit";
    type Error = ToolError;
    type Args = EditArgs;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: "Edit".into(),
            description: "Replace an exact, unique substring of a file with new text. Fails if \
                          `old_string` is absent or occurs more than once. Use an empty \
                          `new_string` to delete the matched text."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "Path to the file, relative to the project root unless absolute"
                    },
                    "old_string": {
                        "type": "string",
                        "description": "The exact text to find; must occur exactly once"
                    },
                    "new_string": {
                        "type": "string",
                        "description": "The replacement text (may be empty to delete)"
                    }
                },
                "required": ["file_path", "old_string", "new_string"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        self.run(&args)
    }
}
