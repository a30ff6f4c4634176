//! Error types for colloquy.

use thiserror::Error;

/// Primary error type for all engine operations.
#[derive(Error, Debug)]
pub enum ColloquyError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Tool execution error: {tool_name} — {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Upstream model error: {0}")]
    Upstream(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NotFound,
    Lifecycle,
    ToolExecution,
    Upstream,
    Persistence,
    Network,
    Timeout,
    Serialization,
    Configuration,
    Unknown,
}

impl ColloquyError {
    /// Create a not-found error for an agent id.
    pub fn agent_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("agent {id}"))
    }

    /// Create a not-found error for a tool name.
    pub fn tool_not_found(name: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("tool {name}"))
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::InvalidTransition(_) => ErrorCategory::Lifecycle,
            Self::ToolExecution { .. } => ErrorCategory::ToolExecution,
            Self::Upstream(_) => ErrorCategory::Upstream,
            Self::Persistence(_) | Self::Io(_) => ErrorCategory::Persistence,
            Self::Network(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Api { status, .. } => match status {
                408 => ErrorCategory::Timeout,
                500..=599 => ErrorCategory::Upstream,
                _ => ErrorCategory::Unknown,
            },
            Self::InvalidArgument(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether a session can absorb this error and keep going.
    ///
    /// Tool failures become visible transcript turns; persistence failures
    /// during context write-back are logged and swallowed. Everything else
    /// aborts the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::ToolExecution | ErrorCategory::Persistence
        )
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ColloquyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_errors_are_recoverable() {
        let err = ColloquyError::ToolExecution {
            tool_name: "calculator".into(),
            message: "division by zero".into(),
        };
        assert!(err.is_recoverable());
        assert_eq!(err.category(), ErrorCategory::ToolExecution);
    }

    #[test]
    fn upstream_errors_are_fatal() {
        let err = ColloquyError::Upstream("model unreachable".into());
        assert!(!err.is_recoverable());
        assert_eq!(err.category(), ErrorCategory::Upstream);
    }

    #[test]
    fn server_status_maps_to_upstream() {
        let err = ColloquyError::Api {
            status: 503,
            message: "overloaded".into(),
        };
        assert_eq!(err.category(), ErrorCategory::Upstream);
    }

    #[test]
    fn not_found_helpers_format_subject() {
        let err = ColloquyError::agent_not_found("a1b2");
        assert_eq!(err.to_string(), "Not found: agent a1b2");
        let err = ColloquyError::tool_not_found("mailer");
        assert_eq!(err.to_string(), "Not found: tool mailer");
    }
}
