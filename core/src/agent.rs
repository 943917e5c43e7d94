//! The bounded LLM request/tool-use loop that drives one phase (§4.3).
//!
//! Issues requests directly through `rig`'s lower-level [`CompletionModel`]
//! trait rather than the higher-level `Agent`/`.prompt()` API: the loop's
//! suspension points, iteration cap, and per-turn error handling are core
//! orchestration logic the phase executor and error classifier must observe,
//! so they're written out explicitly rather than reconstructed behind a
//! `PromptHook` callback interface.

use rig::completion::{
    AssistantContent, CompletionModel, CompletionRequest, Message, ToolDefinition,
};
use rig::message::{Text, ToolCall, ToolFunction, ToolResult, ToolResultContent, UserContent};
use rig::one_or_many::OneOrMany;
use tracing::{debug, info, warn};

use crate::model::AgentConfig;
use crate::tools::dispatcher::ToolDispatcher;

/// Hard cap on tool-use turns within a single phase invocation (§4.3).
pub const DEFAULT_MAX_ITERATIONS: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("exceeded maximum iterations ({0})")]
    MaxIterationsExceeded(usize),

    #[error("model request failed: {0}")]
    Completion(String),
}

/// The result of driving one phase's conversation to completion.
#[derive(Debug, Clone)]
pub struct InvocationOutcome {
    /// The concatenation of the final turn's text blocks.
    pub text: String,
    /// How many request/response turns the loop took.
    pub iterations: usize,
    /// The full message history accumulated across the conversation.
    pub history: Vec<Message>,
    /// The output of the most recent `Bash` tool call the agent made, if
    /// any — the classifier reads this directly rather than the phase
    /// executor re-running the test command itself (§4.5, §4.6).
    pub last_bash_output: Option<String>,
}

/// Drives one phase's LLM conversation: request, observe tool calls, execute
/// them via the dispatcher, feed results back, repeat until the model ends
/// its turn or the iteration cap is hit.
pub struct AgentInvoker<'a, M: CompletionModel> {
    model: M,
    dispatcher: &'a ToolDispatcher,
    max_iterations: usize,
}

impl<'a, M: CompletionModel> AgentInvoker<'a, M> {
    pub fn new(model: M, dispatcher: &'a ToolDispatcher) -> Self {
        Self {
            model,
            dispatcher,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Run the bounded request/tool-use loop for one phase, per §4.3 steps 1-6.
    pub async fn invoke(
        &self,
        config: &AgentConfig,
        user_prompt: String,
    ) -> Result<InvocationOutcome, AgentError> {
        let tools = self.dispatcher.tool_definitions().await;
        let mut history: Vec<Message> = vec![Message::user(user_prompt)];
        let mut last_bash_output: Option<String> = None;

        for iteration in 1..=self.max_iterations {
            debug!(agent = %config.name, iteration, "requesting model completion");
            let request = self.build_request(config, &history, tools.clone());
            let response = self
                .model
                .completion(request)
                .await
                .map_err(|e| AgentError::Completion(e.to_string()))?;

            let contents: Vec<AssistantContent> = response.choice.into_iter().collect();
            history.push(Message::Assistant {
                id: None,
                content: OneOrMany::many(contents.clone())
                    .expect("model response always has at least one content block"),
            });

            let tool_calls: Vec<&AssistantContent> = contents
                .iter()
                .filter(|c| matches!(c, AssistantContent::ToolCall(_)))
                .collect();

            if tool_calls.is_empty() {
                let text = contents
                    .iter()
                    .filter_map(|c| match c {
                        AssistantContent::Text(t) => Some(t.text.clone()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                info!(agent = %config.name, iteration, "model ended its turn");
                return Ok(InvocationOutcome {
                    text,
                    iterations: iteration,
                    history,
                    last_bash_output,
                });
            }

            let mut results = Vec::with_capacity(tool_calls.len());
            for call in tool_calls {
                let AssistantContent::ToolCall(tool_call) = call else {
                    unreachable!("filtered to ToolCall above");
                };
                let name = tool_call.function.name.clone();
                let args = tool_call.function.arguments.clone();
                debug!(agent = %config.name, tool = %name, "dispatching tool call");
                let outcome = self.dispatcher.dispatch(&name, args).await;
                if !outcome.success {
                    warn!(agent = %config.name, tool = %name, "tool call failed");
                }
                if name == "Bash" {
                    last_bash_output = Some(outcome.output.clone());
                }
                results.push(UserContent::ToolResult(ToolResult {
                    id: tool_call.id.clone(),
                    call_id: tool_call.call_id.clone(),
                    content: OneOrMany::one(ToolResultContent::Text(Text {
                        text: outcome.output,
                    })),
                }));
            }
            history.push(Message::User {
                content: OneOrMany::many(results).expect("at least one tool call was present"),
            });
        }

        Err(AgentError::MaxIterationsExceeded(self.max_iterations))
    }

    fn build_request(
        &self,
        config: &AgentConfig,
        history: &[Message],
        tools: Vec<ToolDefinition>,
    ) -> CompletionRequest {
        CompletionRequest {
            preamble: Some(config.system_prompt.clone()),
            chat_history: OneOrMany::many(history.to_vec())
                .expect("history always has at least the initial user prompt"),
            documents: Vec::new(),
            max_tokens: Some(4096),
            temperature: None,
            tools,
            tool_choice: None,
            additional_params: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AgentConfig;
    use rig::completion::{CompletionError, CompletionResponse, Usage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    /// A stub model that replays a fixed sequence of responses, one per
    /// call, so the loop can be exercised without a live provider.
    #[derive(Clone)]
    struct StubModel {
        responses: Arc<Vec<Vec<AssistantContent>>>,
        call_count: Arc<AtomicUsize>,
    }

    impl StubModel {
        fn new(responses: Vec<Vec<AssistantContent>>) -> Self {
            Self {
                responses: Arc::new(responses),
                call_count: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl CompletionModel for StubModel {
        type Response = ();

        async fn completion(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse<Self::Response>, CompletionError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            let content = self
                .responses
                .get(idx)
                .cloned()
                .unwrap_or_else(|| vec![AssistantContent::text("done")]);
            Ok(CompletionResponse {
                choice: OneOrMany::many(content).expect("stub responses are never empty"),
                usage: Usage::default(),
                raw_response: (),
            })
        }
    }

    fn test_config() -> AgentConfig {
        AgentConfig {
            name: "test-agent".into(),
            description: "a test agent".into(),
            system_prompt: "you are a test agent".into(),
            tool_names: vec!["Read", "Write"],
            model: "stub".into(),
        }
    }

    fn text_content(text: &str) -> AssistantContent {
        AssistantContent::Text(Text { text: text.into() })
    }

    fn tool_call_content(id: &str, name: &str, arguments: serde_json::Value) -> AssistantContent {
        AssistantContent::ToolCall(ToolCall {
            id: id.into(),
            call_id: None,
            function: ToolFunction {
                name: name.into(),
                arguments,
            },
        })
    }

    #[tokio::test]
    async fn ends_turn_immediately_on_text_only_response() {
        let dir = tempdir().unwrap();
        let dispatcher = ToolDispatcher::new(dir.path());
        let model = StubModel::new(vec![vec![text_content("PLAN complete")]]);
        let invoker = AgentInvoker::new(model, &dispatcher);
        let outcome = invoker.invoke(&test_config(), "go".into()).await.unwrap();
        assert_eq!(outcome.text, "PLAN complete");
        assert_eq!(outcome.iterations, 1);
        assert!(outcome.last_bash_output.is_none());
    }

    #[tokio::test]
    async fn last_bash_output_tracks_the_most_recent_bash_call() {
        let dir = tempdir().unwrap();
        let dispatcher = ToolDispatcher::new(dir.path());
        let model = StubModel::new(vec![
            vec![tool_call_content(
                "call-1",
                "Bash",
                serde_json::json!({"command": "echo Tests run: 1, Failures: 0"}),
            )],
            vec![text_content("done")],
        ]);
        let invoker = AgentInvoker::new(model, &dispatcher);
        let outcome = invoker.invoke(&test_config(), "go".into()).await.unwrap();
        assert!(outcome.last_bash_output.unwrap().contains("Tests run: 1, Failures: 0"));
    }

    #[tokio::test]
    async fn exceeding_iteration_cap_fails() {
        let dir = tempdir().unwrap();
        let dispatcher = ToolDispatcher::new(dir.path());
        let call = tool_call_content(
            "call-1",
            "Read",
            serde_json::json!({"file_path": "nonexistent.txt"}),
        );
        let model = StubModel::new(vec![vec![call.clone()], vec![call]]);
        let invoker = AgentInvoker::new(model, &dispatcher).with_max_iterations(1);
        let err = invoker.invoke(&test_config(), "go".into()).await.unwrap_err();
        assert!(matches!(err, AgentError::MaxIterationsExceeded(1)));
    }
}
