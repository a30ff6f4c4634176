//! LLM client trait and implementations.

pub mod http;
pub mod openai;

pub use openai::OpenAiClient;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChatTurn, Usage};

/// Tool definition offered to the model.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    pub name: String,
    pub arguments: serde_json::Value,
}

/// One completion round-trip.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    /// Assistant text, possibly empty when a tool call is requested.
    pub content: String,
    /// Tool call requested by the model, if any. The engine's loop is
    /// strictly sequential: one tool call per round-trip.
    pub tool_call: Option<ToolCallRequest>,
    /// Usage metadata. `None` when the provider omitted it; the accountant
    /// treats that as zero without failing the session.
    pub usage: Option<Usage>,
}

/// Core trait implemented by all model clients.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Model identifier recorded in chat logs.
    fn model_name(&self) -> &str;

    /// Request a completion for the given transcript and tool specs.
    async fn complete(&self, messages: &[ChatTurn], tools: &[ToolSpec]) -> Result<Completion>;
}
