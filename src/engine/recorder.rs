//! Chat log recording.
//!
//! Flattens a session outcome into the chat-log schema and hands it to the
//! Log Sink. Every session produces exactly one entry, success or failure.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::config::SessionSettings;
use crate::error::{ColloquyError, Result};
use crate::store::LogSink;
use crate::types::{ChatLogEntry, LogStatus, Usage};

use super::session::SessionOutcome;

/// Per-session facts the recorder needs besides the outcome itself.
#[derive(Debug, Clone)]
pub struct LogContext<'a> {
    pub agent_id: Uuid,
    pub request_message: &'a str,
    pub requestor_id: &'a str,
    pub model_name: &'a str,
    pub settings: &'a SessionSettings,
    pub duration_ms: u64,
    pub memory_summary: Option<&'a str>,
    pub has_memory: bool,
}

/// Serializes session outcomes into flat chat-log records.
pub struct ChatLogRecorder {
    sink: Arc<dyn LogSink>,
}

impl ChatLogRecorder {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    /// Record a successful (or incomplete-but-recovered) session.
    pub async fn record_success(
        &self,
        ctx: &LogContext<'_>,
        outcome: &SessionOutcome,
    ) -> Result<Uuid> {
        let entry = ChatLogEntry {
            response_message: outcome.response.clone(),
            status: LogStatus::Success,
            error_message: None,
            has_tool_calls: !outcome.tool_trace.is_empty(),
            tool_calls: outcome.tool_trace.clone(),
            ..self.base_entry(ctx)
        }
        .with_usage(&outcome.usage);
        self.append(entry).await
    }

    /// Record a failed session with whatever usage accrued before the
    /// failure.
    pub async fn record_failure(
        &self,
        ctx: &LogContext<'_>,
        error: &ColloquyError,
        usage: &Usage,
    ) -> Result<Uuid> {
        let entry = ChatLogEntry {
            status: LogStatus::Error,
            error_message: Some(error.to_string()),
            ..self.base_entry(ctx)
        }
        .with_usage(usage);
        self.append(entry).await
    }

    fn base_entry(&self, ctx: &LogContext<'_>) -> ChatLogEntry {
        ChatLogEntry {
            id: Uuid::new_v4(),
            agent_id: ctx.agent_id,
            timestamp: Utc::now(),
            request_message: ctx.request_message.to_string(),
            response_message: String::new(),
            input_tokens: 0,
            output_tokens: 0,
            total_tokens: 0,
            cost: 0.0,
            duration_ms: ctx.duration_ms,
            model_name: ctx.model_name.to_string(),
            temperature: ctx.settings.temperature.unwrap_or(0.0),
            max_tokens: ctx.settings.max_tokens,
            status: LogStatus::Success,
            error_message: None,
            tool_calls: Vec::new(),
            has_tool_calls: false,
            memory_summary: ctx.memory_summary.map(str::to_string),
            has_memory: ctx.has_memory,
            requestor_id: ctx.requestor_id.to_string(),
        }
    }

    async fn append(&self, entry: ChatLogEntry) -> Result<Uuid> {
        let id = self.sink.append(entry.to_record()).await?;
        debug!(entry_id = %id, agent_id = %entry.agent_id, status = %entry.status, "chat log recorded");
        Ok(id)
    }
}
