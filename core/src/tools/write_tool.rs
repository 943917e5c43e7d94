//! Write tool: creates or overwrites a file, creating missing parent directories.

use std::path::PathBuf;

use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::Deserialize;

use super::{resolve_path, ToolError};

#[derive(Debug, Deserialize)]
pub struct WriteArgs {
    pub file_path: String,
    pub content: String,
}

pub struct WriteTool {
    pub project_root: PathBuf,
}

impl WriteTool {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    pub fn run(&self, args: &WriteArgs) -> Result<String, ToolError> {
        let path = resolve_path(&self.project_root, &args.file_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, &args.content)?;
        Ok(format!(
            "Wrote {} bytes to {}",
            args.content.len(),
            args.file_path
        ))
    }
}

impl Tool for WriteTool {
    const NAME: &'static str = "Write";
    type Error = ToolError;
    type Args = WriteArgs;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: "Write".into(),
            description: "Write content to a file, creating it (and any missing parent \
                          directories) if needed. Overwrites an existing file entirely."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "Path to the file, relative to the project root unless absolute"
                    },
                    "content": {
                        "type": "string",
                        "description": "The full content to write"
                    }
                },
                "required": ["file_path", "content"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        self.run(&args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_file_and_creates_parents() {
        let dir = tempdir().unwrap();
        let tool = WriteTool::new(dir.path());
        tool.run(&WriteArgs {
            file_path: "a/b/c.txt".into(),
            content: "hi".into(),
        })
        .unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("a/b/c.txt")).unwrap(),
            "hi"
        );
    }

    #[test]
    fn overwrites_existing_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "old").unwrap();
        let tool = WriteTool::new(dir.path());
        tool.run(&WriteArgs {
            file_path: "a.txt".into(),
            content: "new".into(),
        })
        .unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "new");
    }

    #[test]
    fn empty_content_is_allowed() {
        let dir = tempdir().unwrap();
        let tool = WriteTool::new(dir.path());
        tool.run(&WriteArgs {
            file_path: "empty.txt".into(),
            content: String::new(),
        })
        .unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("empty.txt")).unwrap(), "");
    }
}
