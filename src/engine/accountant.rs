//! Usage and cost accounting.

use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::store::{LogFilter, LogSink};
use crate::types::{ChatLogEntry, Usage};

/// Accumulates usage across every LLM round-trip within one session.
#[derive(Debug, Default)]
pub struct UsageAccountant {
    total: Usage,
    round_trips: u32,
}

impl UsageAccountant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one round-trip's usage. Missing metadata counts the round
    /// trip but contributes zero tokens; the session never fails over it.
    pub fn record(&mut self, usage: Option<&Usage>) {
        match usage {
            Some(usage) => self.total.merge(usage),
            None => debug!(
                round_trip = self.round_trips + 1,
                "completion carried no usage metadata, counting zero"
            ),
        }
        self.round_trips += 1;
    }

    /// Accumulated usage so far.
    pub fn total(&self) -> &Usage {
        &self.total
    }

    /// Number of round-trips recorded, including zero-usage ones.
    pub fn round_trips(&self) -> u32 {
        self.round_trips
    }

    /// Consume the accountant, yielding the session total.
    pub fn into_total(self) -> Usage {
        self.total
    }
}

/// Aggregated usage for one agent across all of its chat-log entries.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct AgentUsageReport {
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub total_interactions: usize,
}

/// Sum usage over every chat-log entry recorded for `agent_id`.
pub async fn aggregate_agent_usage(sink: &dyn LogSink, agent_id: Uuid) -> Result<AgentUsageReport> {
    let records = sink.query(&LogFilter::for_agent(agent_id)).await?;
    let mut report = AgentUsageReport::default();
    for record in &records {
        let entry = ChatLogEntry::from_record(record);
        report.total_input_tokens += entry.input_tokens as u64;
        report.total_output_tokens += entry.output_tokens as u64;
        report.total_tokens += entry.total_tokens as u64;
        report.total_cost += entry.cost;
        report.total_interactions += 1;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_across_round_trips() {
        let mut accountant = UsageAccountant::new();
        accountant.record(Some(&Usage {
            input_tokens: 10,
            output_tokens: 3,
            total_tokens: 13,
            cost: 0.0001,
        }));
        accountant.record(None);
        accountant.record(Some(&Usage {
            input_tokens: 20,
            output_tokens: 5,
            total_tokens: 25,
            cost: 0.0002,
        }));

        assert_eq!(accountant.round_trips(), 3);
        let total = accountant.into_total();
        assert_eq!(total.input_tokens, 30);
        assert_eq!(total.output_tokens, 8);
        assert_eq!(total.total_tokens, 38);
        assert!((total.cost - 0.0003).abs() < 1e-12);
    }

    #[test]
    fn all_missing_usage_totals_zero() {
        let mut accountant = UsageAccountant::new();
        accountant.record(None);
        accountant.record(None);
        assert_eq!(accountant.round_trips(), 2);
        assert!(accountant.total().is_empty());
    }
}
