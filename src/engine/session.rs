//! Tool-calling session runner.
//!
//! Drives the bounded loop of (LLM call → optional tool invocation →
//! re-prompt) for one inbound message. Tool failures are folded into the
//! transcript for the model to recover from; only LLM-side failures abort
//! the session.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::client::{Completion, LlmClient, ToolSpec};
use crate::error::ColloquyError;
use crate::tools::{Tool, ToolArguments, ToolProvider};
use crate::types::{AgentRecord, ChatTurn, ToolCallRecord, Usage, DEFAULT_PROMPT};

use super::accountant::UsageAccountant;

/// Response text reported when the iteration cap is hit without a final
/// answer. A recoverable outcome, not a session failure.
pub const INCOMPLETE_NOTICE: &str =
    "I was unable to reach a final answer within the allowed number of tool calls. \
Please rephrase or narrow the request.";

/// Result of a completed (or incomplete-but-recovered) session.
#[derive(Debug)]
pub struct SessionOutcome {
    /// The assistant's final reply.
    pub response: String,
    /// Usage accumulated across every round-trip.
    pub usage: Usage,
    /// Ordered trace of tool invocations, including failed ones.
    pub tool_trace: Vec<ToolCallRecord>,
    /// Post-session working memory, system turn excluded.
    pub turns: Vec<ChatTurn>,
    /// False when the iteration cap was reached without a final answer.
    pub completed: bool,
}

/// A fatal session failure, carrying whatever usage accrued before it.
#[derive(Debug)]
pub struct SessionFailure {
    pub error: ColloquyError,
    pub usage: Usage,
}

/// Runs bounded tool-calling sessions against an LLM client and a tool
/// provider.
pub struct SessionRunner {
    llm: Arc<dyn LlmClient>,
    tools: Arc<dyn ToolProvider>,
    max_iterations: usize,
    llm_timeout: Duration,
}

impl SessionRunner {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Arc<dyn ToolProvider>,
        max_iterations: usize,
        llm_timeout: Duration,
    ) -> Self {
        Self {
            llm,
            tools,
            max_iterations,
            llm_timeout,
        }
    }

    /// Process one inbound message for `agent`.
    ///
    /// Working memory is the agent's full persisted history plus the new
    /// user turn; the caller reconciles the returned turns back into the
    /// durable context afterwards.
    pub async fn run(
        &self,
        agent: &AgentRecord,
        message: &str,
    ) -> Result<SessionOutcome, SessionFailure> {
        let resolved = self.resolve_tools(agent).await;
        let specs: Vec<ToolSpec> = resolved
            .iter()
            .map(|t| ToolSpec {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters().schema.clone(),
            })
            .collect();

        let mut working: Vec<ChatTurn> = Vec::with_capacity(agent.context.chat_history.len() + 2);
        working.push(ChatTurn::system(build_system_prompt(
            &agent.prompt,
            &resolved,
        )));
        working.extend(agent.context.chat_history.iter().cloned());
        working.push(ChatTurn::user(message));

        let mut accountant = UsageAccountant::new();
        let mut trace: Vec<ToolCallRecord> = Vec::new();

        for iteration in 1..=self.max_iterations {
            let completion = match self.complete_with_timeout(&working, &specs).await {
                Ok(completion) => completion,
                Err(error) => {
                    return Err(SessionFailure {
                        error,
                        usage: accountant.into_total(),
                    });
                }
            };
            accountant.record(completion.usage.as_ref());

            let Some(call) = completion.tool_call else {
                debug!(
                    agent_id = %agent.id,
                    iteration,
                    tool_calls = trace.len(),
                    "session complete"
                );
                working.push(ChatTurn::assistant(completion.content.clone()));
                return Ok(SessionOutcome {
                    response: completion.content,
                    usage: accountant.into_total(),
                    tool_trace: trace,
                    turns: strip_system(working),
                    completed: true,
                });
            };

            debug!(agent_id = %agent.id, iteration, tool = %call.name, "tool call requested");
            working.push(ChatTurn::assistant_tool_request(
                completion.content,
                call.name.clone(),
            ));

            let input = call.arguments.to_string();
            let output = self.dispatch_tool(&resolved, &call.name, call.arguments).await;
            trace.push(ToolCallRecord {
                tool: call.name.clone(),
                input,
                output: output.clone(),
            });
            working.push(ChatTurn::tool(call.name, output));
        }

        warn!(
            agent_id = %agent.id,
            max_iterations = self.max_iterations,
            "iteration cap reached without a final answer"
        );
        working.push(ChatTurn::assistant(INCOMPLETE_NOTICE));
        Ok(SessionOutcome {
            response: INCOMPLETE_NOTICE.to_string(),
            usage: accountant.into_total(),
            tool_trace: trace,
            turns: strip_system(working),
            completed: false,
        })
    }

    /// Resolve the agent's declared tool names.
    ///
    /// Unresolved names are logged and dropped, never fatal.
    async fn resolve_tools(&self, agent: &AgentRecord) -> Vec<Arc<dyn Tool>> {
        let mut resolved = Vec::with_capacity(agent.tools.len());
        for name in &agent.tools {
            match self.tools.resolve(name).await {
                Some(tool) => resolved.push(tool),
                None => warn!(agent_id = %agent.id, tool = %name, "declared tool did not resolve, skipping"),
            }
        }
        resolved
    }

    async fn complete_with_timeout(
        &self,
        messages: &[ChatTurn],
        specs: &[ToolSpec],
    ) -> crate::error::Result<Completion> {
        match tokio::time::timeout(self.llm_timeout, self.llm.complete(messages, specs)).await {
            Ok(result) => result,
            Err(_) => Err(ColloquyError::Timeout(self.llm_timeout.as_millis() as u64)),
        }
    }

    /// Invoke a requested tool, converting every failure into text the
    /// model sees on the next iteration.
    async fn dispatch_tool(
        &self,
        resolved: &[Arc<dyn Tool>],
        name: &str,
        arguments: serde_json::Value,
    ) -> String {
        let Some(tool) = resolved.iter().find(|t| t.name() == name) else {
            warn!(tool = %name, "model requested an unavailable tool");
            return format!("Tool {name:?} is not available.");
        };
        match tool.invoke(&ToolArguments::new(arguments)).await {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = %name, error = %e, "tool invocation failed");
                format!("Tool {name:?} failed: {e}")
            }
        }
    }
}

/// Drop the leading system turn from working memory before hand-off.
fn strip_system(working: Vec<ChatTurn>) -> Vec<ChatTurn> {
    working.into_iter().filter(|t| !t.is_system()).collect()
}

/// Assemble the system prompt, appending tool guidance when the agent has
/// tools but its prompt gives no tool instructions.
fn build_system_prompt(prompt: &str, tools: &[Arc<dyn Tool>]) -> String {
    let base = if prompt.trim().is_empty() {
        DEFAULT_PROMPT
    } else {
        prompt
    };
    let mut text = base.to_string();
    if !tools.is_empty() && !base.to_lowercase().contains("tool") {
        let names: Vec<String> = tools
            .iter()
            .map(|t| format!("{} ({})", t.name(), t.description()))
            .collect();
        text.push_str(&format!(
            "\n\nYou can call the following tools when they help answer the request: {}. \
Prefer calling a tool over guessing at facts or arithmetic.",
            names.join(", ")
        ));
    }
    text
}
