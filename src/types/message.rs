//! Conversation turn types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single turn in an agent conversation.
///
/// Turns are plain text. Tool requests and results carry the tool name in
/// [`tool_name`](Self::tool_name); everything else leaves it empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    /// Create a system turn.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::System,
            content: text.into(),
            tool_name: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: text.into(),
            tool_name: None,
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant turn.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: text.into(),
            tool_name: None,
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant turn that requested a tool call.
    pub fn assistant_tool_request(text: impl Into<String>, tool: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: text.into(),
            tool_name: Some(tool.into()),
            timestamp: Utc::now(),
        }
    }

    /// Create a tool-result turn.
    pub fn tool(tool: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Tool,
            content: output.into(),
            tool_name: Some(tool.into()),
            timestamp: Utc::now(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == TurnRole::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == TurnRole::Assistant
    }

    pub fn is_system(&self) -> bool {
        self.role == TurnRole::System
    }
}

/// Conversation role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    System,
    User,
    Assistant,
    Tool,
}

/// One entry in a session's tool-call trace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRecord {
    /// Tool name as the model requested it.
    pub tool: String,
    /// Arguments serialized to JSON text.
    pub input: String,
    /// Tool output, or the error text shown to the model.
    pub output: String,
}
