//! Convenience re-exports for common use.

pub use crate::client::{Completion, LlmClient, OpenAiClient, ToolCallRequest, ToolSpec};
pub use crate::config::{EngineConfig, SessionSettings};
pub use crate::engine::{ChatEngine, ChatOutcome, LifecycleManager, MemoryPolicy};
pub use crate::error::{ColloquyError, Result};
pub use crate::store::{AgentStore, LogFilter, LogSink};
pub use crate::tools::{FnTool, Tool, ToolArguments, ToolParameters, ToolRegistry};
pub use crate::types::{
    AgentContext, AgentRecord, AgentStatus, ChatLogEntry, ChatTurn, LogStatus, ToolCallRecord,
    TurnRole, Usage,
};
