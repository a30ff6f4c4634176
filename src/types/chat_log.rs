//! Chat log entries and their flat-record serialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::warn;
use uuid::Uuid;

use super::message::ToolCallRecord;
use super::record::{self, FlatRecord};
use super::usage::Usage;

/// Outcome of a logged session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogStatus {
    Success,
    Error,
}

/// An immutable record of one chat session: inputs, outputs, cost, outcome.
///
/// Created exactly once per `process_chat_message` invocation, on both the
/// success and failure paths. Owned by the Log Sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatLogEntry {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub request_message: String,
    pub response_message: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
    pub cost: f64,
    pub duration_ms: u64,
    pub model_name: String,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    pub status: LogStatus,
    pub error_message: Option<String>,
    pub tool_calls: Vec<ToolCallRecord>,
    pub has_tool_calls: bool,
    pub memory_summary: Option<String>,
    pub has_memory: bool,
    pub requestor_id: String,
}

impl ChatLogEntry {
    /// Attach accumulated usage counters.
    pub fn with_usage(mut self, usage: &Usage) -> Self {
        self.input_tokens = usage.input_tokens;
        self.output_tokens = usage.output_tokens;
        self.total_tokens = usage.total_tokens;
        self.cost = usage.cost;
        self
    }

    /// Encode into the flat shape the Log Sink accepts.
    ///
    /// The tool-call trace is serialized to JSON text; optional fields
    /// encode as empty strings so every record carries the same keys.
    pub fn to_record(&self) -> FlatRecord {
        let tool_calls =
            serde_json::to_string(&self.tool_calls).unwrap_or_else(|_| "[]".to_string());
        let mut record = FlatRecord::new();
        record.insert("id".into(), self.id.to_string().into());
        record.insert("agent_id".into(), self.agent_id.to_string().into());
        record.insert("timestamp".into(), self.timestamp.to_rfc3339().into());
        record.insert(
            "request_message".into(),
            self.request_message.clone().into(),
        );
        record.insert(
            "response_message".into(),
            self.response_message.clone().into(),
        );
        record.insert("input_tokens".into(), self.input_tokens.into());
        record.insert("output_tokens".into(), self.output_tokens.into());
        record.insert("total_tokens".into(), self.total_tokens.into());
        record.insert("cost".into(), self.cost.into());
        record.insert("duration_ms".into(), (self.duration_ms as i64).into());
        record.insert("model_name".into(), self.model_name.clone().into());
        record.insert("temperature".into(), self.temperature.into());
        record.insert(
            "max_tokens".into(),
            self.max_tokens
                .map(|m| m.to_string())
                .unwrap_or_else(|| "none".to_string())
                .into(),
        );
        record.insert("status".into(), self.status.to_string().into());
        record.insert(
            "error_message".into(),
            self.error_message.clone().unwrap_or_default().into(),
        );
        record.insert("tool_calls".into(), tool_calls.into());
        record.insert("has_tool_calls".into(), self.has_tool_calls.into());
        record.insert(
            "memory_summary".into(),
            self.memory_summary.clone().unwrap_or_default().into(),
        );
        record.insert("has_memory".into(), self.has_memory.into());
        record.insert("requestor_id".into(), self.requestor_id.clone().into());
        record
    }

    /// Decode from a flat record, defensively.
    ///
    /// Numeric fields coerce to zero on malformed input; an unusable id or
    /// timestamp falls back to a nil/epoch value with a warning. A stored
    /// record never fails a read.
    pub fn from_record(record: &FlatRecord) -> Self {
        let id = parse_uuid(record, "id");
        let agent_id = parse_uuid(record, "agent_id");
        let timestamp_text = record::get_str(record, "timestamp");
        let timestamp = DateTime::parse_from_rfc3339(&timestamp_text)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| {
                warn!(entry_id = %id, value = %timestamp_text, "malformed log timestamp, defaulting to epoch");
                DateTime::<Utc>::UNIX_EPOCH
            });

        let status_text = record::get_str(record, "status");
        let status = status_text.parse().unwrap_or_else(|_| {
            warn!(entry_id = %id, status = %status_text, "unknown log status, defaulting to error");
            LogStatus::Error
        });

        let tool_calls_text = record::get_str(record, "tool_calls");
        let tool_calls: Vec<ToolCallRecord> = if tool_calls_text.is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&tool_calls_text).unwrap_or_else(|e| {
                warn!(entry_id = %id, error = %e, "corrupt tool_calls field, defaulting to empty");
                Vec::new()
            })
        };

        let error_message = non_empty(record::get_str(record, "error_message"));
        let memory_summary = non_empty(record::get_str(record, "memory_summary"));
        let max_tokens_text = record::get_str(record, "max_tokens");
        let max_tokens = max_tokens_text.trim().parse().ok();

        Self {
            id,
            agent_id,
            timestamp,
            request_message: record::get_str(record, "request_message"),
            response_message: record::get_str(record, "response_message"),
            input_tokens: record::get_i64(record, "input_tokens").max(0) as u32,
            output_tokens: record::get_i64(record, "output_tokens").max(0) as u32,
            total_tokens: record::get_i64(record, "total_tokens").max(0) as u32,
            cost: record::get_f64(record, "cost"),
            duration_ms: record::get_i64(record, "duration_ms").max(0) as u64,
            model_name: record::get_str(record, "model_name"),
            temperature: record::get_f64(record, "temperature"),
            max_tokens,
            status,
            error_message,
            has_tool_calls: record::get_bool(record, "has_tool_calls"),
            tool_calls,
            memory_summary,
            has_memory: record::get_bool(record, "has_memory"),
            requestor_id: record::get_str(record, "requestor_id"),
        }
    }
}

fn parse_uuid(record: &FlatRecord, key: &str) -> Uuid {
    let text = record::get_str(record, key);
    Uuid::parse_str(&text).unwrap_or_else(|_| {
        warn!(key, value = %text, "malformed uuid field, defaulting to nil");
        Uuid::nil()
    })
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
