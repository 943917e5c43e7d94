//! Drives the fixed PLAN → RED → GREEN → REFACTOR → PLAN … cycle to
//! completion or abort, assembling the user-facing [`WorkflowResult`] as it
//! goes (§4.7, GLOSSARY "Cycle"/"Workflow").

use rig::completion::CompletionModel;
use tracing::info;

use tdd_core::{CycleResult, GitRepo, HandoffState, NotesManager, Phase, WorkflowResult};

use crate::error::OrchestratorError;
use crate::phase_executor::PhaseExecutor;
use crate::test_list;

pub struct Orchestrator<'a, M: CompletionModel + Clone> {
    executor: PhaseExecutor<'a, M>,
    git: &'a GitRepo,
    notes: &'a NotesManager,
    project_root: std::path::PathBuf,
}

impl<'a, M: CompletionModel + Clone> Orchestrator<'a, M> {
    pub fn new(
        executor: PhaseExecutor<'a, M>,
        git: &'a GitRepo,
        notes: &'a NotesManager,
        project_root: impl Into<std::path::PathBuf>,
    ) -> Self {
        Self {
            executor,
            git,
            notes,
            project_root: project_root.into(),
        }
    }

    /// Start a fresh workflow for `feature_request`, reading `test-list.md`
    /// (if present) for any already-pending tests.
    pub async fn run(
        &self,
        feature_request: &str,
        project_root: &std::path::Path,
        started_at: impl Into<String>,
        now: impl Fn() -> String,
    ) -> Result<WorkflowResult, OrchestratorError> {
        let entries = test_list::read(project_root);
        let pending = test_list::pending(&entries);
        let state = HandoffState::initial(pending);
        self.drive(feature_request, state, started_at.into(), now).await
    }

    /// Resume the most recently recorded handoff state from the notes store
    /// and continue execution at the recovered phase.
    pub async fn resume(
        &self,
        feature_request: &str,
        started_at: impl Into<String>,
        now: impl Fn() -> String,
    ) -> Result<WorkflowResult, OrchestratorError> {
        let head = self.git.head()?.ok_or(OrchestratorError::NoHandoffState)?;
        let (_, state) = self
            .notes
            .find_latest(&head)?
            .ok_or(OrchestratorError::NoHandoffState)?;
        self.drive(feature_request, state, started_at.into(), now).await
    }

    async fn drive(
        &self,
        feature_request: &str,
        mut state: HandoffState,
        started_at: String,
        now: impl Fn() -> String,
    ) -> Result<WorkflowResult, OrchestratorError> {
        let mut cycles: Vec<CycleResult> = Vec::new();
        let mut current_cycle_commits: Vec<String> = Vec::new();
        let mut current_cycle_description = String::new();

        loop {
            if state.is_complete() {
                break;
            }

            let phase = state.phase;
            info!(phase = %phase, cycle = state.cycle_number, retry = state.retry_count, "executing phase");

            if phase == Phase::Plan {
                current_cycle_commits.clear();
            }

            let outcome = self.executor.execute(phase, state).await?;
            state = outcome.state;

            if outcome.aborted {
                let error = state
                    .error
                    .clone()
                    .unwrap_or_else(|| "workflow aborted".to_string());
                cycles.push(CycleResult {
                    cycle_number: state.cycle_number,
                    test_description: current_cycle_description.clone(),
                    success: false,
                    commit_ids: current_cycle_commits.clone(),
                    error: Some(error.clone()),
                });
                return Ok(WorkflowResult {
                    feature_request: feature_request.to_string(),
                    success: false,
                    cycles,
                    total_tests: state.completed_tests.len(),
                    started_at,
                    ended_at: now(),
                    final_state: state,
                });
            }

            // PLAN's commit (updating test-list.md) counts toward the
            // cycle's commitIds alongside RED/GREEN/REFACTOR's (§8 property
            // 4); `commit_id` is only `Some` when HEAD actually moved.
            if let Some(commit) = &outcome.commit_id {
                current_cycle_commits.push(commit.clone());
            }

            if phase == Phase::Plan {
                current_cycle_description = state
                    .current_test
                    .as_ref()
                    .map(|t| t.description.clone())
                    .unwrap_or_default();

                let test_list_fully_checked =
                    test_list::all_checked(&test_list::read(&self.project_root));

                if state.current_test.is_none() && test_list_fully_checked {
                    state.phase = Phase::Complete;
                    state.next_phase = None;
                    if let Some(head) = self.git.head()? {
                        self.notes.write_note(&head, &state)?;
                    }
                    break;
                }
            }

            if phase == Phase::Refactor {
                cycles.push(CycleResult {
                    cycle_number: state.cycle_number,
                    test_description: current_cycle_description.clone(),
                    success: true,
                    commit_ids: current_cycle_commits.clone(),
                    error: None,
                });
                state.cycle_number += 1;
            }

            let next = phase.next().expect("non-COMPLETE phase always has a successor");
            state.phase = next;
            state.next_phase = next.next();
        }

        Ok(WorkflowResult {
            feature_request: feature_request.to_string(),
            success: true,
            total_tests: state.completed_tests.len(),
            cycles,
            started_at,
            ended_at: now(),
            final_state: state,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::process::Command;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use rig::completion::{AssistantContent, CompletionError, CompletionRequest, CompletionResponse, Usage};
    use rig::message::{Text, ToolCall, ToolFunction};
    use rig::one_or_many::OneOrMany;
    use tempfile::tempdir;

    use tdd_core::ToolDispatcher;

    use super::*;
    use crate::phase_executor::PhaseExecutor;

    #[derive(Clone)]
    struct StubModel {
        turns: Arc<Vec<Vec<AssistantContent>>>,
        call_count: Arc<AtomicUsize>,
    }

    impl StubModel {
        fn new(turns: Vec<Vec<AssistantContent>>) -> Self {
            Self {
                turns: Arc::new(turns),
                call_count: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl rig::completion::CompletionModel for StubModel {
        type Response = ();

        async fn completion(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse<Self::Response>, CompletionError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            let content = self
                .turns
                .get(idx)
                .cloned()
                .unwrap_or_else(|| vec![AssistantContent::text("done")]);
            Ok(CompletionResponse {
                choice: OneOrMany::many(content).expect("stub turns are never empty"),
                usage: Usage::default(),
                raw_response: (),
            })
        }
    }

    fn text(s: &str) -> AssistantContent {
        AssistantContent::Text(Text { text: s.into() })
    }

    fn tool_call(id: &str, name: &str, arguments: serde_json::Value) -> AssistantContent {
        AssistantContent::ToolCall(ToolCall {
            id: id.into(),
            call_id: None,
            function: ToolFunction {
                name: name.into(),
                arguments,
            },
        })
    }

    fn init_repo() -> (tempfile::TempDir, GitRepo, NotesManager, ToolDispatcher) {
        let dir = tempdir().unwrap();
        for args in [
            vec!["init", "-q"],
            vec!["config", "user.email", "t@t.test"],
            vec!["config", "user.name", "Test"],
        ] {
            Command::new("git").args(&args).current_dir(dir.path()).output().unwrap();
        }
        std::fs::write(dir.path().join("README.md"), "seed").unwrap();
        Command::new("git").args(["add", "-A"]).current_dir(dir.path()).output().unwrap();
        Command::new("git")
            .args(["commit", "-m", "plan: seed"])
            .current_dir(dir.path())
            .output()
            .unwrap();

        let git = GitRepo::new(dir.path());
        let notes = NotesManager::new(dir.path());
        let dispatcher = ToolDispatcher::new(dir.path());
        (dir, git, notes, dispatcher)
    }

    /// Drives one full PLAN → RED → GREEN → REFACTOR → PLAN(complete) cycle
    /// against a scripted model and a real (tempdir) git repository.
    #[tokio::test]
    async fn drives_a_single_cycle_to_completion() {
        let (dir, git, notes, dispatcher) = init_repo();

        let model = StubModel::new(vec![
            // PLAN: updates test-list.md, commits, then reports the selection.
            vec![
                tool_call(
                    "c0",
                    "Write",
                    serde_json::json!({
                        "file_path": "test-list.md",
                        "content": "- [ ] adds two numbers\n"
                    }),
                ),
                tool_call(
                    "c0b",
                    "Bash",
                    serde_json::json!({"command": "git add -A && git commit -m 'plan: select next test'"}),
                ),
            ],
            vec![text(
                r#"{"currentTest": {"description": "adds two numbers", "testFile": "t/AdderTest", "implFile": "s/Adder"}}"#,
            )],
            // RED: run the suite (reporting the expected failure) and commit
            // in the same Bash call; the orchestrator classifies from it.
            vec![tool_call(
                "c2",
                "Bash",
                serde_json::json!({
                    "command": "echo 'Tests run: 1, Failures: 1' && echo '1) testAdd FAILED' \
                        && git commit --allow-empty -m 'test: add failing test'"
                }),
            )],
            vec![text("red done")],
            // GREEN: run the now-passing suite and commit in the same call.
            vec![tool_call(
                "c4",
                "Bash",
                serde_json::json!({
                    "command": "echo 'Tests run: 1, Failures: 0' && echo 'BUILD SUCCESS' \
                        && git commit --allow-empty -m 'feat: implement'"
                }),
            )],
            vec![text("green done")],
            // REFACTOR: nothing to clean up, empty commit, still green.
            vec![tool_call(
                "c5",
                "Bash",
                serde_json::json!({
                    "command": "echo 'Tests run: 1, Failures: 0' && echo 'BUILD SUCCESS' \
                        && git commit --allow-empty -m 'refactor: nothing to clean up'"
                }),
            )],
            vec![text("refactor done")],
            // PLAN again: check off the completed test, then report none remain.
            vec![tool_call(
                "c6",
                "Write",
                serde_json::json!({
                    "file_path": "test-list.md",
                    "content": "- [x] adds two numbers\n"
                }),
            )],
            vec![text(r#"{"currentTest": null}"#)],
        ]);

        let executor = PhaseExecutor::new(
            model,
            "stub".to_string(),
            &dispatcher,
            &git,
            &notes,
            "mvn test".to_string(),
            3,
            10,
        );
        let orchestrator = Orchestrator::new(executor, &git, &notes, dir.path());

        let result = orchestrator
            .run("add a calculator", dir.path(), "2026-01-01T00:00:00Z", || "2026-01-01T00:01:00Z".to_string())
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.total_tests, 1);
        assert_eq!(result.cycles.len(), 1);
        assert!(result.cycles[0].success);
        assert_eq!(result.cycles[0].commit_ids.len(), 4);
        assert_eq!(result.final_state.phase, Phase::Complete);
    }
}
