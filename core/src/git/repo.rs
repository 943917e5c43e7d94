//! Repository operations: stage/commit, HEAD, reset, diff, changed files.
//!
//! Shells out to the system `git` binary rather than linking a git library,
//! matching this codebase's existing git-facade pattern. Staging and commit
//! get one bounded retry with exponential backoff for transient lock-file
//! races (plain process-spawn contention, not an LLM-classified error); every
//! other operation is not retried.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

/// Base delay for the stage/commit retry backoff (100ms, 200ms, 400ms, ...).
const RETRY_BASE_DELAY_MS: u64 = 100;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("git {operation} failed: {message}")]
    Command { operation: String, message: String },

    #[error("failed to launch git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("commit {0} not found")]
    UnknownCommit(String),
}

impl GitError {
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            GitError::Command { .. } => {
                "inspect the repository with `git status`; a lock file under .git may need removal"
            }
            GitError::Spawn(_) => "ensure `git` is installed and on PATH",
            GitError::UnknownCommit(_) => "verify the commit id with `git log --oneline`",
        }
    }
}

/// True for errors worth one bounded retry: lock contention and similar
/// transient process-spawn races, not semantic git failures.
fn is_transient(message: &str) -> bool {
    let m = message.to_ascii_lowercase();
    m.contains("index.lock") || m.contains("unable to create") || m.contains("resource busy")
}

pub struct GitRepo {
    working_dir: PathBuf,
}

impl GitRepo {
    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.working_dir)
            .output()?;
        if !output.status.success() {
            return Err(GitError::Command {
                operation: args.join(" "),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn run_with_retry(&self, args: &[&str]) -> Result<String, GitError> {
        let mut attempt = 0;
        loop {
            match self.run(args) {
                Ok(out) => return Ok(out),
                Err(GitError::Command { operation, message })
                    if is_transient(&message) && attempt < MAX_RETRIES =>
                {
                    let delay = RETRY_BASE_DELAY_MS * (1 << attempt);
                    std::thread::sleep(Duration::from_millis(delay));
                    attempt += 1;
                    let _ = (&operation, &message);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Current HEAD commit id, or `None` on an empty (unborn-branch) repository.
    pub fn head(&self) -> Result<Option<String>, GitError> {
        match self.run(&["rev-parse", "HEAD"]) {
            Ok(sha) => Ok(Some(sha)),
            Err(GitError::Command { message, .. }) if message.contains("unknown revision") => {
                Ok(None)
            }
            Err(GitError::Command { message, .. }) if message.contains("ambiguous argument") => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Stage all changes (including deletions) and commit, returning the new
    /// commit id. An empty commit is allowed when `allow_empty` is set
    /// (used by REFACTOR, which may have nothing to clean up).
    pub fn commit_all(&self, message: &str, allow_empty: bool) -> Result<String, GitError> {
        self.run_with_retry(&["add", "-A"])?;
        let mut args = vec!["commit", "-m", message];
        if allow_empty {
            args.push("--allow-empty");
        }
        self.run_with_retry(&args)?;
        self.run(&["rev-parse", "HEAD"])
    }

    /// Hard reset the working tree and index to `commit`.
    pub fn reset_hard(&self, commit: &str) -> Result<(), GitError> {
        self.run(&["cat-file", "-e", commit]).map_err(|_| {
            GitError::UnknownCommit(commit.to_string())
        })?;
        self.run(&["reset", "--hard", commit])?;
        Ok(())
    }

    /// Unified diff for `commit` against its parent (the empty tree if root).
    pub fn diff_for_commit(&self, commit: &str) -> Result<String, GitError> {
        let parent = format!("{commit}^");
        if self.run(&["cat-file", "-e", &parent]).is_ok() {
            self.run(&["diff", &parent, commit])
        } else {
            let empty_tree = self.run(&["hash-object", "-t", "tree", "/dev/null"])
                .unwrap_or_else(|_| "4b825dc642cb6eb9a060e54bf8d69288fbee4904".to_string());
            self.run(&["diff", &empty_tree, commit])
        }
    }

    /// Paths changed by `commit`.
    pub fn changed_files(&self, commit: &str) -> Result<Vec<String>, GitError> {
        let parent = format!("{commit}^");
        let out = if self.run(&["cat-file", "-e", &parent]).is_ok() {
            self.run(&["diff", "--name-only", &parent, commit])?
        } else {
            self.run(&["diff-tree", "--no-commit-id", "--name-only", "-r", commit])?
        };
        Ok(out.lines().map(|s| s.to_string()).filter(|s| !s.is_empty()).collect())
    }

    pub fn has_uncommitted_changes(&self) -> Result<bool, GitError> {
        Ok(!self.run(&["status", "--porcelain"])?.is_empty())
    }

    /// Full commit message (subject + body) for `commit`.
    pub fn message(&self, commit: &str) -> Result<String, GitError> {
        self.run(&["log", "-1", "--format=%B", commit])
    }

    /// Commits newest-first reachable from HEAD, `limit` entries.
    pub fn log(&self, limit: usize) -> Result<Vec<String>, GitError> {
        let out = self.run(&[
            "log",
            "--format=%H",
            &format!("-{limit}"),
        ])?;
        Ok(out.lines().map(|s| s.to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn init_repo() -> (tempfile::TempDir, GitRepo) {
        let dir = tempdir().unwrap();
        for args in [
            vec!["init", "-q"],
            vec!["config", "user.email", "t@t.test"],
            vec!["config", "user.name", "Test"],
        ] {
            Command::new("git").args(&args).current_dir(dir.path()).output().unwrap();
        }
        let repo = GitRepo::new(dir.path());
        (dir, repo)
    }

    #[test]
    fn head_is_none_on_empty_repo() {
        let (_dir, repo) = init_repo();
        assert_eq!(repo.head().unwrap(), None);
    }

    #[test]
    fn commit_all_creates_commit_and_updates_head() {
        let (dir, repo) = init_repo();
        std::fs::write(dir.path().join("a.txt"), "hi").unwrap();
        let sha = repo.commit_all("plan: initial", false).unwrap();
        assert_eq!(repo.head().unwrap(), Some(sha));
    }

    #[test]
    fn allow_empty_permits_commit_with_no_changes() {
        let (dir, repo) = init_repo();
        std::fs::write(dir.path().join("a.txt"), "hi").unwrap();
        repo.commit_all("plan: initial", false).unwrap();
        let sha = repo.commit_all("refactor: nothing to clean up", true).unwrap();
        assert_eq!(repo.head().unwrap(), Some(sha));
    }

    #[test]
    fn reset_hard_restores_prior_commit() {
        let (dir, repo) = init_repo();
        std::fs::write(dir.path().join("a.txt"), "v1").unwrap();
        let first = repo.commit_all("plan: v1", false).unwrap();
        std::fs::write(dir.path().join("a.txt"), "v2").unwrap();
        repo.commit_all("feat: v2", false).unwrap();
        repo.reset_hard(&first).unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "v1");
        assert_eq!(repo.head().unwrap(), Some(first));
    }

    #[test]
    fn changed_files_lists_the_commits_paths() {
        let (dir, repo) = init_repo();
        std::fs::write(dir.path().join("a.txt"), "v1").unwrap();
        std::fs::write(dir.path().join("b.txt"), "v1").unwrap();
        let sha = repo.commit_all("plan: two files", false).unwrap();
        let mut files = repo.changed_files(&sha).unwrap();
        files.sort();
        assert_eq!(files, vec!["a.txt".to_string(), "b.txt".to_string()]);
    }

    #[test]
    fn has_uncommitted_changes_reflects_working_tree() {
        let (dir, repo) = init_repo();
        std::fs::write(dir.path().join("a.txt"), "v1").unwrap();
        assert!(repo.has_uncommitted_changes().unwrap());
        repo.commit_all("plan: v1", false).unwrap();
        assert!(!repo.has_uncommitted_changes().unwrap());
    }
}
