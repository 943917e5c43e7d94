//! Operator configuration: environment variables plus `tdd.properties`,
//! constructed once at startup into a single [`Config`] (§10.3).
//!
//! Read the same env-var-with-parse-and-default-fallback way this codebase's
//! own settings already do (`SwarmConfig::default()` in the teacher repo):
//! `std::env::var(..).ok().and_then(|s| s.parse().ok()).unwrap_or(default)`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::detect::detect_test_command;

pub const DEFAULT_MODEL: &str = "gpt-4.1";
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_MAX_ITERATIONS: usize = 50;
const DEFAULT_BASH_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("ANTHROPIC_API_KEY is not set")]
    MissingApiKey,

    #[error(
        "no test command configured: no recognized build manifest was found under {0}, and \
         `test.command` is not set in tdd.properties"
    )]
    NoTestCommand(PathBuf),

    #[error("project root {0} does not exist")]
    MissingProjectRoot(PathBuf),
}

impl ConfigError {
    pub fn recovery_hint(&self) -> String {
        match self {
            ConfigError::MissingApiKey => {
                "export ANTHROPIC_API_KEY=<your key> before running `tdd`".to_string()
            }
            ConfigError::NoTestCommand(root) => format!(
                "add `test.command = <your test command>` to {}/tdd.properties",
                root.display()
            ),
            ConfigError::MissingProjectRoot(root) => {
                format!("create {} or pass a valid -p/--project", root.display())
            }
        }
    }
}

/// Settings constructed once at startup and threaded through every
/// component that needs to talk to an external collaborator.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub project_root: PathBuf,
    pub model: String,
    pub max_retries: u32,
    pub max_iterations: usize,
    pub bash_timeout: Duration,
    pub test_command: String,
    pub api_base_url: Option<String>,
}

impl Config {
    /// Load configuration for `project_root`, reading environment variables
    /// and (if present) `tdd.properties` at the project root.
    pub fn load(project_root: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let project_root = project_root.into();
        if !project_root.exists() {
            return Err(ConfigError::MissingProjectRoot(project_root));
        }

        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| ConfigError::MissingApiKey)?;

        let properties = load_properties(&project_root.join("tdd.properties"));

        let max_retries = std::env::var("TDD_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_RETRIES);

        let max_iterations = std::env::var("TDD_MAX_ITERATIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_MAX_ITERATIONS);

        let model = std::env::var("TDD_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let bash_timeout_secs = properties
            .get("bash.timeout")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_BASH_TIMEOUT_SECS);

        let test_command = match properties.get("test.command") {
            Some(cmd) => cmd.clone(),
            None => detect_test_command(&project_root)
                .ok_or_else(|| ConfigError::NoTestCommand(project_root.clone()))?,
        };

        let api_base_url = std::env::var("TDD_API_BASE_URL").ok();

        Ok(Self {
            api_key,
            project_root,
            model,
            max_retries,
            max_iterations,
            bash_timeout: Duration::from_secs(bash_timeout_secs),
            test_command,
            api_base_url,
        })
    }
}

/// Parse a `tdd.properties` `key = value` file. `#`-prefixed lines and blank
/// lines are ignored; missing file yields an empty map (properties are
/// optional overrides, not a required file).
fn load_properties(path: &Path) -> HashMap<String, String> {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return HashMap::new();
    };
    contents
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let (key, value) = line.split_once('=')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}
