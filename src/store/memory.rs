//! In-memory store implementations.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;
use crate::types::record::{self, FlatRecord};
use crate::types::AgentRecord;

use super::{record_matches, AgentStore, LogFilter, LogSink};

/// In-memory agent store.
///
/// Stores flat records internally so the encode/decode boundary is
/// exercised exactly as it is with a durable backend.
#[derive(Clone, Default)]
pub struct MemoryAgentStore {
    agents: Arc<RwLock<HashMap<Uuid, FlatRecord>>>,
}

impl MemoryAgentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentStore for MemoryAgentStore {
    async fn get(&self, id: Uuid) -> Result<Option<AgentRecord>> {
        let agents = self.agents.read().await;
        agents
            .get(&id)
            .map(AgentRecord::from_record)
            .transpose()
    }

    async fn put(&self, agent: AgentRecord) -> Result<AgentRecord> {
        let record = agent.to_record()?;
        self.agents.write().await.insert(agent.id, record);
        Ok(agent)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.agents.write().await.remove(&id).is_some())
    }

    async fn list(&self) -> Result<Vec<AgentRecord>> {
        let agents = self.agents.read().await;
        let mut listed: Vec<AgentRecord> = agents
            .values()
            .map(AgentRecord::from_record)
            .collect::<Result<_>>()?;
        listed.sort_by_key(|a| a.created_at);
        Ok(listed)
    }
}

/// In-memory append-only log sink.
#[derive(Clone, Default)]
pub struct MemoryLogSink {
    records: Arc<RwLock<Vec<FlatRecord>>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records appended so far.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl LogSink for MemoryLogSink {
    async fn append(&self, record: FlatRecord) -> Result<Uuid> {
        let id = Uuid::parse_str(&record::get_str(&record, "id")).unwrap_or_else(|_| Uuid::new_v4());
        self.records.write().await.push(record);
        Ok(id)
    }

    async fn query(&self, filter: &LogFilter) -> Result<Vec<FlatRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| record_matches(r, filter))
            .cloned()
            .collect())
    }
}
