//! Agent lifecycle management.
//!
//! Tracks each agent's coarse status across an in-memory active set and
//! the durable store, reconciling the two when they disagree (e.g. after
//! a process restart left the store claiming RUNNING).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ColloquyError, Result};
use crate::store::AgentStore;
use crate::tools::{Tool, ToolProvider};
use crate::types::{AgentRecord, AgentStatus, ChatTurn};

/// Working state for an agent in the active set.
pub struct ActiveAgent {
    pub status: AgentStatus,
    /// Tool handles resolved at start time; unresolved names were skipped.
    pub tools: Vec<Arc<dyn Tool>>,
    /// Scratch transcript for the current activation. Durable history
    /// lives on the agent record, not here.
    pub transcript: Vec<ChatTurn>,
    pub started_at: DateTime<Utc>,
}

/// Manages agent start/pause/resume and status queries.
///
/// The active set is owned here and guarded by an `RwLock`; nothing in the
/// engine reaches it except through this manager.
pub struct LifecycleManager {
    store: Arc<dyn AgentStore>,
    tools: Arc<dyn ToolProvider>,
    active: RwLock<HashMap<Uuid, ActiveAgent>>,
}

impl LifecycleManager {
    pub fn new(store: Arc<dyn AgentStore>, tools: Arc<dyn ToolProvider>) -> Self {
        Self {
            store,
            tools,
            active: RwLock::new(HashMap::new()),
        }
    }

    /// Start an agent: construct its working context and mark it RUNNING
    /// in memory and in the durable store.
    pub async fn start(&self, agent: &AgentRecord) -> Result<()> {
        if agent.status.is_terminal() {
            return Err(ColloquyError::InvalidTransition(format!(
                "agent {} is {} and cannot be started",
                agent.id, agent.status
            )));
        }

        let mut handles = Vec::with_capacity(agent.tools.len());
        for name in &agent.tools {
            match self.tools.resolve(name).await {
                Some(tool) => handles.push(tool),
                None => {
                    warn!(agent_id = %agent.id, tool = %name, "declared tool did not resolve at start, skipping")
                }
            }
        }

        {
            let mut active = self.active.write().await;
            if active.contains_key(&agent.id) {
                return Err(ColloquyError::InvalidTransition(format!(
                    "agent {} is already started",
                    agent.id
                )));
            }
            active.insert(
                agent.id,
                ActiveAgent {
                    status: AgentStatus::Running,
                    tools: handles,
                    transcript: Vec::new(),
                    started_at: Utc::now(),
                },
            );
        }

        let mut updated = agent.clone();
        updated.status = AgentStatus::Running;
        updated.touch();
        if let Err(e) = self.store.put(updated).await {
            // Keep memory and store consistent: roll the activation back.
            self.active.write().await.remove(&agent.id);
            return Err(e);
        }
        info!(agent_id = %agent.id, "agent started");
        Ok(())
    }

    /// Pause a running agent.
    ///
    /// For an agent in the active set, only the in-memory status flips; the
    /// durable-store update is the caller's responsibility so it can batch
    /// the write with other changes. For an agent known only to the store
    /// (e.g. after a restart), a stale RUNNING is forced to PAUSED directly
    /// in the store; PAUSED is a no-op; anything else is an invalid
    /// transition.
    pub async fn pause(&self, agent_id: Uuid) -> Result<()> {
        {
            let mut active = self.active.write().await;
            if let Some(entry) = active.get_mut(&agent_id) {
                if entry.status != AgentStatus::Running {
                    return Err(ColloquyError::InvalidTransition(format!(
                        "agent {agent_id} is {} and cannot be paused",
                        entry.status
                    )));
                }
                entry.status = AgentStatus::Paused;
                info!(agent_id = %agent_id, "agent paused");
                return Ok(());
            }
        }

        let agent = self
            .store
            .get(agent_id)
            .await?
            .ok_or_else(|| ColloquyError::agent_not_found(agent_id))?;
        match agent.status {
            AgentStatus::Running => {
                info!(agent_id = %agent_id, "agent not in active set, forcing stale RUNNING to PAUSED in store");
                let mut updated = agent;
                updated.status = AgentStatus::Paused;
                updated.touch();
                self.store.put(updated).await?;
                Ok(())
            }
            AgentStatus::Paused => Ok(()),
            other => Err(ColloquyError::InvalidTransition(format!(
                "agent {agent_id} is {other} and cannot be paused"
            ))),
        }
    }

    /// Resume a paused agent. Requires presence in the active set.
    pub async fn resume(&self, agent_id: Uuid) -> Result<()> {
        let mut active = self.active.write().await;
        let entry = active
            .get_mut(&agent_id)
            .ok_or_else(|| ColloquyError::agent_not_found(agent_id))?;
        if entry.status != AgentStatus::Paused {
            return Err(ColloquyError::InvalidTransition(format!(
                "agent {agent_id} is {} and cannot be resumed",
                entry.status
            )));
        }
        entry.status = AgentStatus::Running;
        info!(agent_id = %agent_id, "agent resumed");
        Ok(())
    }

    /// Current status: the active set wins, the durable store is the
    /// fallback, absence from both is an error.
    pub async fn get_status(&self, agent_id: Uuid) -> Result<AgentStatus> {
        if let Some(entry) = self.active.read().await.get(&agent_id) {
            return Ok(entry.status);
        }
        match self.store.get(agent_id).await? {
            Some(agent) => Ok(agent.status),
            None => Err(ColloquyError::agent_not_found(agent_id)),
        }
    }

    /// Mark an agent FAILED after an unrecoverable execution error, in
    /// memory and (best effort) in the store. Terminal states are left
    /// untouched.
    pub async fn mark_failed(&self, agent_id: Uuid) {
        {
            let mut active = self.active.write().await;
            if let Some(entry) = active.get_mut(&agent_id) {
                if entry.status.is_terminal() {
                    return;
                }
                entry.status = AgentStatus::Failed;
            }
        }
        match self.store.get(agent_id).await {
            Ok(Some(mut agent)) if !agent.status.is_terminal() => {
                agent.status = AgentStatus::Failed;
                agent.touch();
                if let Err(e) = self.store.put(agent).await {
                    warn!(agent_id = %agent_id, error = %e, "failed to persist FAILED status");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(agent_id = %agent_id, error = %e, "failed to load agent while marking FAILED"),
        }
    }

    /// Whether the agent is in the active set.
    pub async fn is_active(&self, agent_id: Uuid) -> bool {
        self.active.read().await.contains_key(&agent_id)
    }
}
