//! Conversation orchestration engine.
//!
//! [`ChatEngine`] turns one inbound user message into a bounded
//! tool-calling session, reconciles the session transcript against the
//! agent's persisted history, accounts token usage and cost, and records
//! exactly one chat-log entry per invocation, success or failure.

pub mod accountant;
pub mod lifecycle;
pub mod memory;
pub mod recorder;
pub mod session;

pub use accountant::{aggregate_agent_usage, AgentUsageReport, UsageAccountant};
pub use lifecycle::{ActiveAgent, LifecycleManager};
pub use memory::{reconcile, MemoryPolicy};
pub use recorder::{ChatLogRecorder, LogContext};
pub use session::{SessionOutcome, SessionRunner, INCOMPLETE_NOTICE};

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};
use uuid::Uuid;

use crate::client::LlmClient;
use crate::config::EngineConfig;
use crate::error::{ColloquyError, Result};
use crate::store::{AgentStore, LogFilter, LogSink};
use crate::tools::ToolProvider;
use crate::types::{ChatLogEntry, ToolCallRecord, Usage};

/// Result of one `process_chat_message` call.
#[derive(Debug)]
pub struct ChatOutcome {
    pub response: String,
    pub usage: Usage,
    pub tool_calls: Vec<ToolCallRecord>,
    /// False when the session hit the iteration cap without a final answer.
    pub completed: bool,
    /// Chat-log entry id, when the append succeeded.
    pub log_id: Option<Uuid>,
}

/// The orchestration engine. Collaborators are injected as trait objects;
/// the engine owns no transport, no persistence internals, and no global
/// state.
pub struct ChatEngine {
    config: EngineConfig,
    store: Arc<dyn AgentStore>,
    sink: Arc<dyn LogSink>,
    runner: SessionRunner,
    recorder: ChatLogRecorder,
    lifecycle: LifecycleManager,
    model_name: String,
}

impl ChatEngine {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn AgentStore>,
        tools: Arc<dyn ToolProvider>,
        llm: Arc<dyn LlmClient>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        let model_name = llm.model_name().to_string();
        let runner = SessionRunner::new(
            llm,
            tools.clone(),
            config.max_iterations,
            config.llm_timeout,
        );
        let recorder = ChatLogRecorder::new(sink.clone());
        let lifecycle = LifecycleManager::new(store.clone(), tools);
        Self {
            config,
            store,
            sink,
            runner,
            recorder,
            lifecycle,
            model_name,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Lifecycle operations (start/pause/resume/status) for this engine's
    /// agents.
    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    /// Process one inbound chat message for an agent.
    ///
    /// Control flow: load the agent, run the bounded tool-calling session
    /// over its full history, record the chat log, reconcile the session
    /// turns back into the agent's durable context, and persist. A failed
    /// context write-back is logged and absorbed; the chat response is
    /// still returned. LLM and store-read failures propagate as typed
    /// errors after a failure log entry is written.
    ///
    /// Concurrent calls for the same agent id are not mutually excluded:
    /// context persistence is last-writer-wins. Serialize per-agent calls
    /// upstream if that matters for your deployment.
    pub async fn process_chat_message(
        &self,
        agent_id: Uuid,
        message: &str,
        requestor_id: Option<&str>,
    ) -> Result<ChatOutcome> {
        let started = Instant::now();
        let requestor = requestor_id.unwrap_or(&self.config.default_requestor);

        let agent = match self.store.get(agent_id).await {
            Ok(Some(agent)) => agent,
            Ok(None) => {
                let error = ColloquyError::agent_not_found(agent_id);
                self.record_failure(agent_id, message, requestor, &error, &Usage::default(), started, None, false)
                    .await;
                return Err(error);
            }
            Err(error) => {
                self.record_failure(agent_id, message, requestor, &error, &Usage::default(), started, None, false)
                    .await;
                return Err(error);
            }
        };

        let history = agent.context.chat_history.clone();
        let summary = agent.context.summary.clone();
        let has_memory = !history.is_empty() || summary.is_some();

        let outcome = match self.runner.run(&agent, message).await {
            Ok(outcome) => outcome,
            Err(failure) => {
                self.lifecycle.mark_failed(agent_id).await;
                self.record_failure(
                    agent_id,
                    message,
                    requestor,
                    &failure.error,
                    &failure.usage,
                    started,
                    summary.as_deref(),
                    has_memory,
                )
                .await;
                return Err(failure.error);
            }
        };

        let ctx = LogContext {
            agent_id,
            request_message: message,
            requestor_id: requestor,
            model_name: &self.model_name,
            settings: &self.config.settings,
            duration_ms: started.elapsed().as_millis() as u64,
            memory_summary: summary.as_deref(),
            has_memory,
        };
        let log_id = match self.recorder.record_success(&ctx, &outcome).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(agent_id = %agent_id, error = %e, "chat log append failed");
                None
            }
        };

        let reconciled = memory::reconcile(&history, &outcome.turns, &self.config.memory);
        let mut updated = agent;
        updated.context.chat_history = reconciled;
        updated.touch();
        if let Err(e) = self.store.put(updated).await {
            // The chat succeeded; a lost context update must not mask that.
            warn!(agent_id = %agent_id, error = %e, "context persistence failed after session");
        }

        info!(
            agent_id = %agent_id,
            total_tokens = outcome.usage.total_tokens,
            tool_calls = outcome.tool_trace.len(),
            completed = outcome.completed,
            "chat message processed"
        );
        Ok(ChatOutcome {
            response: outcome.response,
            usage: outcome.usage,
            tool_calls: outcome.tool_trace,
            completed: outcome.completed,
            log_id,
        })
    }

    /// Aggregate token usage across all chat-log entries for an agent.
    pub async fn agent_usage(&self, agent_id: Uuid) -> Result<AgentUsageReport> {
        aggregate_agent_usage(self.sink.as_ref(), agent_id).await
    }

    /// Query chat logs, decoding each flat record defensively.
    pub async fn chat_logs(&self, filter: &LogFilter) -> Result<Vec<ChatLogEntry>> {
        let records = self.sink.query(filter).await?;
        Ok(records.iter().map(ChatLogEntry::from_record).collect())
    }

    #[allow(clippy::too_many_arguments)]
    async fn record_failure(
        &self,
        agent_id: Uuid,
        message: &str,
        requestor: &str,
        error: &ColloquyError,
        usage: &Usage,
        started: Instant,
        memory_summary: Option<&str>,
        has_memory: bool,
    ) {
        let ctx = LogContext {
            agent_id,
            request_message: message,
            requestor_id: requestor,
            model_name: &self.model_name,
            settings: &self.config.settings,
            duration_ms: started.elapsed().as_millis() as u64,
            memory_summary,
            has_memory,
        };
        if let Err(e) = self.recorder.record_failure(&ctx, error, usage).await {
            warn!(agent_id = %agent_id, error = %e, "failed to record failure chat log");
        }
    }
}
