//! Agent records and their flat-record serialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::warn;
use uuid::Uuid;

use super::message::ChatTurn;
use super::record::{self, FlatRecord};
use crate::error::{ColloquyError, Result};

/// Fallback system prompt for agents created without one.
pub const DEFAULT_PROMPT: &str = "You are a helpful AI assistant. You aim to provide clear, \
accurate, and helpful responses while maintaining a professional and friendly tone.";

/// Coarse operational status of an agent.
///
/// Persisted as an uppercase string in flat metadata.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum AgentStatus {
    Idle,
    Created,
    Running,
    Paused,
    Completed,
    Failed,
    Error,
}

impl AgentStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, AgentStatus::Completed | AgentStatus::Failed)
    }
}

/// Durable conversation state carried on an agent record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentContext {
    #[serde(default)]
    pub chat_history: Vec<ChatTurn>,
    /// Rolling summary of evicted history, when a memory window produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl AgentContext {
    pub fn is_empty(&self) -> bool {
        self.chat_history.is_empty() && self.summary.is_none()
    }
}

/// A configured agent: identity, prompt, tool list, status, and context.
///
/// Owned by the Agent Store; the engine holds a transient, possibly stale,
/// copy while a session runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentRecord {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub prompt: String,
    /// Ordered tool names; uniqueness enforced on insert. Names resolve
    /// against the tool provider at use time, not at creation time.
    pub tools: Vec<String>,
    pub hitl_enabled: bool,
    pub status: AgentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub context: AgentContext,
}

impl AgentRecord {
    /// Create a new agent with a fresh id and `Created` status.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        let prompt = prompt.into();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            prompt: if prompt.is_empty() {
                DEFAULT_PROMPT.to_string()
            } else {
                prompt
            },
            tools: Vec::new(),
            hitl_enabled: false,
            status: AgentStatus::Created,
            created_at: now,
            updated_at: now,
            context: AgentContext::default(),
        }
    }

    /// Attach tool names, deduplicating while preserving order.
    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = dedup_preserving_order(tools.into_iter().map(Into::into));
        self
    }

    /// Bump `updated_at` after a mutation.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Encode into the flat shape the Agent Store accepts.
    ///
    /// `tools` and `context` are JSON-in-a-string; everything else is a
    /// scalar field.
    pub fn to_record(&self) -> Result<FlatRecord> {
        let mut record = FlatRecord::new();
        record.insert("id".into(), self.id.to_string().into());
        record.insert("name".into(), self.name.clone().into());
        record.insert("description".into(), self.description.clone().into());
        record.insert("prompt".into(), self.prompt.clone().into());
        record.insert("tools".into(), serde_json::to_string(&self.tools)?.into());
        record.insert("hitl_enabled".into(), self.hitl_enabled.into());
        record.insert("status".into(), self.status.to_string().into());
        record.insert("created_at".into(), self.created_at.to_rfc3339().into());
        record.insert("updated_at".into(), self.updated_at.to_rfc3339().into());
        record.insert(
            "context".into(),
            serde_json::to_string(&self.context)?.into(),
        );
        Ok(record)
    }

    /// Decode from a flat record.
    ///
    /// Identity fields must parse; a record without a valid id or timestamps
    /// is unusable. Complex fields degrade: a corrupt `tools` or `context`
    /// string decodes to empty with a warning rather than failing the read.
    pub fn from_record(record: &FlatRecord) -> Result<Self> {
        let id_text = record::get_str(record, "id");
        let id = Uuid::parse_str(&id_text)
            .map_err(|e| ColloquyError::Persistence(format!("agent record id {id_text:?}: {e}")))?;
        let created_at = parse_timestamp(record, "created_at")?;
        let mut updated_at = parse_timestamp(record, "updated_at")?;
        if updated_at < created_at {
            updated_at = created_at;
        }

        let status_text = record::get_str(record, "status");
        let status = status_text.parse().unwrap_or_else(|_| {
            warn!(agent_id = %id, status = %status_text, "unknown agent status, defaulting to IDLE");
            AgentStatus::Idle
        });

        let tools_text = record::get_str(record, "tools");
        let tools: Vec<String> = match serde_json::from_str::<Vec<String>>(&tools_text) {
            Ok(tools) => dedup_preserving_order(tools),
            Err(e) => {
                warn!(agent_id = %id, error = %e, "corrupt tools field, defaulting to empty");
                Vec::new()
            }
        };

        let context_text = record::get_str(record, "context");
        let context = if context_text.is_empty() {
            AgentContext::default()
        } else {
            serde_json::from_str(&context_text).unwrap_or_else(|e| {
                warn!(agent_id = %id, error = %e, "corrupt context field, defaulting to empty");
                AgentContext::default()
            })
        };

        Ok(Self {
            id,
            name: record::get_str(record, "name"),
            description: record::get_str(record, "description"),
            prompt: record::get_str(record, "prompt"),
            tools,
            hitl_enabled: record::get_bool(record, "hitl_enabled"),
            status,
            created_at,
            updated_at,
            context,
        })
    }
}

fn parse_timestamp(record: &FlatRecord, key: &str) -> Result<DateTime<Utc>> {
    let text = record::get_str(record, key);
    DateTime::parse_from_rfc3339(&text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ColloquyError::Persistence(format!("agent record {key} {text:?}: {e}")))
}

fn dedup_preserving_order(tools: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tools
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}
