//! Tool registry: the engine's Tool Provider.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::tool::Tool;
use crate::error::{ColloquyError, Result};

/// Resolves tool names to handles at use time.
///
/// Agents declare tools by name only; whether a name resolves is decided
/// here, per session, never at agent creation time.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Resolve a name to a tool handle, if registered.
    async fn resolve(&self, name: &str) -> Option<Arc<dyn Tool>>;
}

/// In-memory tool registry.
///
/// Safe to clone and share across tasks; registration and resolution go
/// through an `RwLock`-guarded map.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Arc<RwLock<HashMap<String, Arc<dyn Tool>>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Duplicate names are rejected.
    pub async fn register(&self, tool: Arc<dyn Tool>) -> Result<()> {
        let mut tools = self.tools.write().await;
        let name = tool.name().to_string();
        if tools.contains_key(&name) {
            return Err(ColloquyError::InvalidArgument(format!(
                "tool {name:?} is already registered"
            )));
        }
        tools.insert(name, tool);
        Ok(())
    }

    /// Remove a tool by name.
    pub async fn unregister(&self, name: &str) -> Result<()> {
        let mut tools = self.tools.write().await;
        if tools.remove(name).is_none() {
            return Err(ColloquyError::tool_not_found(name));
        }
        Ok(())
    }

    /// List registered tools as (name, description) pairs, sorted by name.
    pub async fn list(&self) -> Vec<(String, String)> {
        let tools = self.tools.read().await;
        let mut listing: Vec<(String, String)> = tools
            .values()
            .map(|t| (t.name().to_string(), t.description().to_string()))
            .collect();
        listing.sort();
        listing
    }
}

#[async_trait]
impl ToolProvider for ToolRegistry {
    async fn resolve(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().await.get(name).cloned()
    }
}
