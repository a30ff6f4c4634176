//! File-backed store implementations.
//!
//! Agents persist as one JSON document per id; chat logs append to a JSON
//! Lines file. Both serialize the same flat records the in-memory stores
//! hold, so a deployment can switch backends without a migration.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{ColloquyError, Result};
use crate::types::record::{self, FlatRecord};
use crate::types::AgentRecord;

use super::{record_matches, AgentStore, LogFilter, LogSink};

/// Agent store writing one `{id}.json` per agent under a directory.
pub struct JsonFileAgentStore {
    dir: PathBuf,
}

impl JsonFileAgentStore {
    /// Open a store rooted at `dir`, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

#[async_trait]
impl AgentStore for JsonFileAgentStore {
    async fn get(&self, id: Uuid) -> Result<Option<AgentRecord>> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(&path).await?;
        let record: FlatRecord = serde_json::from_str(&content)
            .map_err(|e| ColloquyError::Persistence(format!("{}: {e}", path.display())))?;
        AgentRecord::from_record(&record).map(Some)
    }

    async fn put(&self, agent: AgentRecord) -> Result<AgentRecord> {
        let record = agent.to_record()?;
        let content = serde_json::to_string_pretty(&record)?;
        tokio::fs::write(self.path_for(agent.id), content).await?;
        Ok(agent)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(false);
        }
        tokio::fs::remove_file(path).await?;
        Ok(true)
    }

    async fn list(&self) -> Result<Vec<AgentRecord>> {
        let mut agents = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = tokio::fs::read_to_string(&path).await?;
            let record: FlatRecord = serde_json::from_str(&content)
                .map_err(|e| ColloquyError::Persistence(format!("{}: {e}", path.display())))?;
            agents.push(AgentRecord::from_record(&record)?);
        }
        agents.sort_by_key(|a| a.created_at);
        Ok(agents)
    }
}

/// Append-only JSON Lines chat log.
pub struct JsonlLogSink {
    path: PathBuf,
    // Serializes appends so concurrent sessions cannot interleave lines.
    write_lock: Mutex<()>,
}

impl JsonlLogSink {
    /// Open (or create) a log file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }
}

#[async_trait]
impl LogSink for JsonlLogSink {
    async fn append(&self, record: FlatRecord) -> Result<Uuid> {
        let id = Uuid::parse_str(&record::get_str(&record, "id")).unwrap_or_else(|_| Uuid::new_v4());
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(id)
    }

    async fn query(&self, filter: &LogFilter) -> Result<Vec<FlatRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        let mut records = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let record: FlatRecord = serde_json::from_str(line)
                .map_err(|e| ColloquyError::Persistence(format!("{}: {e}", self.path.display())))?;
            if record_matches(&record, filter) {
                records.push(record);
            }
        }
        Ok(records)
    }
}
