//! Durable storage traits and implementations.
//!
//! Both stores persist flat records only (see [`crate::types::record`]);
//! typed entities are encoded/decoded at this boundary and nowhere else.

pub mod file;
pub mod memory;

pub use file::{JsonFileAgentStore, JsonlLogSink};
pub use memory::{MemoryAgentStore, MemoryLogSink};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::types::record::{self, FlatRecord};
use crate::types::AgentRecord;

/// Document store for agent records, keyed by id.
#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<AgentRecord>>;
    async fn put(&self, agent: AgentRecord) -> Result<AgentRecord>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
    async fn list(&self) -> Result<Vec<AgentRecord>>;
}

/// Filter for chat-log queries.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub agent_id: Option<Uuid>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl LogFilter {
    pub fn for_agent(agent_id: Uuid) -> Self {
        Self {
            agent_id: Some(agent_id),
            ..Self::default()
        }
    }

    pub fn time_range(since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self {
            agent_id: None,
            since: Some(since),
            until: Some(until),
        }
    }
}

/// Append-only sink for flattened chat-log records.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Append a record, returning its id.
    async fn append(&self, record: FlatRecord) -> Result<Uuid>;
    /// Query records matching a filter, ordered by insertion.
    async fn query(&self, filter: &LogFilter) -> Result<Vec<FlatRecord>>;
}

/// Whether a flat log record matches a filter.
///
/// Records with unparseable agent ids or timestamps are excluded from
/// filtered queries rather than failing them.
pub(crate) fn record_matches(record: &FlatRecord, filter: &LogFilter) -> bool {
    if let Some(want) = filter.agent_id {
        let got = record::get_str(record, "agent_id");
        if Uuid::parse_str(&got).map(|id| id != want).unwrap_or(true) {
            return false;
        }
    }
    if filter.since.is_some() || filter.until.is_some() {
        let text = record::get_str(record, "timestamp");
        let Ok(ts) = DateTime::parse_from_rfc3339(&text).map(|t| t.with_timezone(&Utc)) else {
            return false;
        };
        if filter.since.map(|s| ts < s).unwrap_or(false) {
            return false;
        }
        if filter.until.map(|u| ts > u).unwrap_or(false) {
            return false;
        }
    }
    true
}
