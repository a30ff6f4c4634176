//! Tool trait and closure-based tool wrapper.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use super::arguments::ToolArguments;
use super::types::ToolParameters;
use crate::error::Result;

/// Core tool trait — implement to create custom tools.
///
/// Tools produce plain text; whatever they return is appended to the
/// session transcript verbatim for the model to read.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match what the model calls).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON Schema parameters.
    fn parameters(&self) -> &ToolParameters;

    /// Execute the tool with parsed arguments.
    async fn invoke(&self, args: &ToolArguments) -> Result<String>;
}

/// Type alias for the tool handler function.
type ToolHandler =
    dyn Fn(ToolArguments) -> Pin<Box<dyn Future<Output = Result<String>> + Send>> + Send + Sync;

/// Closure-based tool for quick tool creation.
pub struct FnTool {
    name: String,
    description: String,
    parameters: ToolParameters,
    handler: Arc<ToolHandler>,
}

impl FnTool {
    /// Create a tool from a closure.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    async fn invoke(&self, args: &ToolArguments) -> Result<String> {
        (self.handler)(args.clone()).await
    }
}

impl std::fmt::Debug for FnTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fn_tool_executes_closure() {
        let tool = FnTool::new(
            "shout",
            "Uppercase the input",
            ToolParameters::object()
                .string("text", "Text to shout", true)
                .build(),
            |args| async move { Ok(args.get_str("text")?.to_uppercase()) },
        );
        let out = tool
            .invoke(&ToolArguments::new(serde_json::json!({"text": "hi"})))
            .await
            .unwrap();
        assert_eq!(out, "HI");
    }
}
