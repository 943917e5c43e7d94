//! Read tool: returns the UTF-8 contents of a file under the project root.

use std::path::PathBuf;

use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::Deserialize;

use super::{resolve_path, ToolError};

#[derive(Debug, Deserialize)]
pub struct ReadArgs {
    pub file_path: String,
}

pub struct ReadTool {
    pub project_root: PathBuf,
}

impl ReadTool {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    pub fn run(&self, args: &ReadArgs) -> Result<String, ToolError> {
        let path = resolve_path(&self.project_root, &args.file_path);
        let metadata = std::fs::metadata(&path)
            .map_err(|_| ToolError::NotFound(args.file_path.clone()))?;
        if !metadata.is_file() {
            return Err(ToolError::NotARegularFile(args.file_path.clone()));
        }
        std::fs::read_to_string(&path).map_err(ToolError::Io)
    }
}

impl Tool for ReadTool {
    const NAME: &'static str = "Read";
    type Error = ToolError;
    type Args = ReadArgs;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: "Read".into(),
            description: "Read the UTF-8 contents of a file. Fails if the file is missing or \
                          is not a regular file."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "Path to the file, relative to the project root unless absolute"
                    }
                },
                "required": ["file_path"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        self.run(&args)
    }
}
