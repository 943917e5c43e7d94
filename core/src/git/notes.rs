//! Git-notes handoff store: writes and reads [`HandoffState`] from a
//! dedicated notes ref so phases can hand off context across process
//! restarts without polluting commit messages or `refs/notes/commits`.
//!
//! Unlike [`super::repo::GitRepo`], notes operations are never retried —
//! a failure here means the handoff itself is unreliable, which is always
//! fatal and always operator-visible (§4.2 "Notes store").

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::model::HandoffState;

const NOTES_REF: &str = "refs/notes/tdd-handoff";

#[derive(Debug, thiserror::Error)]
pub enum NotesError {
    #[error("git notes {operation} failed: {message}")]
    Command { operation: String, message: String },

    #[error("failed to launch git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("handoff note on {0} is not valid JSON: {1}")]
    Malformed(String, serde_json::Error),
}

impl NotesError {
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            NotesError::Command { .. } => {
                "the handoff note may be missing or the ref corrupt; inspect with \
                 `git notes --ref=tdd-handoff list`"
            }
            NotesError::Spawn(_) => "ensure `git` is installed and on PATH",
            NotesError::Malformed(..) => {
                "the handoff note's JSON is corrupt; recover the prior commit's state by hand \
                 or restart the cycle with `tdd run`"
            }
        }
    }
}

pub struct NotesManager {
    working_dir: PathBuf,
}

impl NotesManager {
    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<String, NotesError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.working_dir)
            .output()?;
        if !output.status.success() {
            return Err(NotesError::Command {
                operation: args.join(" "),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Attach (or overwrite) the handoff note on `commit`.
    pub fn write_note(&self, commit: &str, state: &HandoffState) -> Result<(), NotesError> {
        let json = serde_json::to_string(state)
            .expect("HandoffState always serializes");
        self.run(&[
            "notes",
            "--ref",
            NOTES_REF,
            "add",
            "-f",
            "-m",
            &json,
            commit,
        ])?;
        Ok(())
    }

    /// Read the handoff note on `commit`, if any.
    pub fn read_note(&self, commit: &str) -> Result<Option<HandoffState>, NotesError> {
        match self.run(&["notes", "--ref", NOTES_REF, "show", commit]) {
            Ok(json) => {
                let state = serde_json::from_str(&json)
                    .map_err(|e| NotesError::Malformed(commit.to_string(), e))?;
                Ok(Some(state))
            }
            Err(NotesError::Command { message, .. })
                if message.contains("no note found") || message.contains("no such note") =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Walk ancestry from `head` and return the first commit carrying a
    /// handoff note (newest first) — the most recent recorded phase state.
    pub fn find_latest(&self, head: &str) -> Result<Option<(String, HandoffState)>, NotesError> {
        let log = self.run(&["log", "--format=%H", head])?;
        for commit in log.lines() {
            if let Some(state) = self.read_note(commit)? {
                return Ok(Some((commit.to_string(), state)));
            }
        }
        Ok(None)
    }

    /// Every commit carrying a handoff note reachable from HEAD, newest first.
    pub fn list_all(&self) -> Result<Vec<(String, HandoffState)>, NotesError> {
        let list = match self.run(&["notes", "--ref", NOTES_REF, "list"]) {
            Ok(out) => out,
            Err(NotesError::Command { message, .. }) if message.contains("no note") => {
                return Ok(Vec::new())
            }
            Err(e) => return Err(e),
        };
        // `git notes list` lines are "<note-blob-sha> <annotated-object-sha>".
        let mut commits: Vec<String> = list
            .lines()
            .filter_map(|line| line.split_whitespace().nth(1))
            .map(|s| s.to_string())
            .collect();

        // Order newest-first by walking HEAD's ancestry rather than trusting
        // `git notes list`'s (object-hash-ordered) output.
        let head = self.run(&["rev-parse", "HEAD"]).unwrap_or_default();
        if !head.is_empty() {
            let log = self.run(&["log", "--format=%H", &head]).unwrap_or_default();
            let order: Vec<&str> = log.lines().collect();
            commits.sort_by_key(|c| order.iter().position(|o| *o == c).unwrap_or(usize::MAX));
        }

        let mut out = Vec::with_capacity(commits.len());
        for commit in commits {
            if let Some(state) = self.read_note(&commit)? {
                out.push((commit, state));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Phase;
    use tempfile::tempdir;

    fn init_repo() -> (tempfile::TempDir, NotesManager) {
        let dir = tempdir().unwrap();
        for args in [
            vec!["init", "-q"],
            vec!["config", "user.email", "t@t.test"],
            vec!["config", "user.name", "Test"],
        ] {
            Command::new("git").args(&args).current_dir(dir.path()).output().unwrap();
        }
        std::fs::write(dir.path().join("a.txt"), "hi").unwrap();
        Command::new("git")
            .args(["add", "-A"])
            .current_dir(dir.path())
            .output()
            .unwrap();
        Command::new("git")
            .args(["commit", "-m", "plan: initial"])
            .current_dir(dir.path())
            .output()
            .unwrap();
        let manager = NotesManager::new(dir.path());
        (dir, manager)
    }

    fn head(dir: &Path) -> String {
        String::from_utf8(
            Command::new("git")
                .args(["rev-parse", "HEAD"])
                .current_dir(dir)
                .output()
                .unwrap()
                .stdout,
        )
        .unwrap()
        .trim()
        .to_string()
    }

    #[test]
    fn write_then_read_round_trips() {
        let (dir, manager) = init_repo();
        let sha = head(dir.path());
        let state = HandoffState::initial(vec![]);
        manager.write_note(&sha, &state).unwrap();
        let read = manager.read_note(&sha).unwrap().unwrap();
        assert_eq!(read.phase, state.phase);
    }

    #[test]
    fn read_note_on_commit_without_one_is_none() {
        let (dir, manager) = init_repo();
        let sha = head(dir.path());
        assert!(manager.read_note(&sha).unwrap().is_none());
    }

    #[test]
    fn find_latest_skips_commits_without_notes() {
        let (dir, manager) = init_repo();
        let first = head(dir.path());
        let mut state = HandoffState::initial(vec![]);
        state.phase = Phase::Red;
        manager.write_note(&first, &state).unwrap();

        std::fs::write(dir.path().join("b.txt"), "v2").unwrap();
        Command::new("git").args(["add", "-A"]).current_dir(dir.path()).output().unwrap();
        Command::new("git")
            .args(["commit", "-m", "red: add failing test"])
            .current_dir(dir.path())
            .output()
            .unwrap();
        let second = head(dir.path());

        let (found_commit, found_state) = manager.find_latest(&second).unwrap().unwrap();
        assert_eq!(found_commit, first);
        assert_eq!(found_state.phase, Phase::Red);
    }

    #[test]
    fn list_all_is_empty_with_no_notes() {
        let (_dir, manager) = init_repo();
        assert!(manager.list_all().unwrap().is_empty());
    }

    #[test]
    fn list_all_returns_newest_first() {
        let (dir, manager) = init_repo();
        let first = head(dir.path());
        manager.write_note(&first, &HandoffState::initial(vec![])).unwrap();

        std::fs::write(dir.path().join("b.txt"), "v2").unwrap();
        Command::new("git").args(["add", "-A"]).current_dir(dir.path()).output().unwrap();
        Command::new("git")
            .args(["commit", "-m", "green: implement"])
            .current_dir(dir.path())
            .output()
            .unwrap();
        let second = head(dir.path());
        let mut state = HandoffState::initial(vec![]);
        state.phase = Phase::Green;
        manager.write_note(&second, &state).unwrap();

        let all = manager.list_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].0, second);
        assert_eq!(all[1].0, first);
    }
}
