//! Conversation memory reconciliation.
//!
//! An LLM context window forces a bounded, possibly summarized working
//! memory. Persisting that bounded view verbatim after every turn would
//! permanently erase the older turns the window evicted. Reconciliation is
//! the single place that guarantees the durable transcript never loses
//! turns under normal operation.

use tracing::debug;

use crate::types::{ChatTurn, TurnRole};

/// Thresholds governing history reconciliation.
///
/// `shrink_threshold` is the point past which a much shorter live memory is
/// read as evidence of window eviction; `max_turns` bounds the persisted
/// transcript. Both are policy, not law — tune per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryPolicy {
    pub shrink_threshold: usize,
    pub max_turns: usize,
}

impl Default for MemoryPolicy {
    fn default() -> Self {
        Self {
            shrink_threshold: 50,
            max_turns: 100,
        }
    }
}

/// Merge persisted history with a session's post-turn working memory.
///
/// When the persisted history is long and the live memory is short, the
/// live side has evidently been windowed: keep the persisted history and
/// append only the newest exchange from the live side. Otherwise the live
/// memory holds the full conversation (the session loaded all of it at
/// start) and becomes canonical.
///
/// The result is sorted by timestamp (concurrent updates may interleave)
/// and truncated to the most recent `max_turns`.
pub fn reconcile(persisted: &[ChatTurn], live: &[ChatTurn], policy: &MemoryPolicy) -> Vec<ChatTurn> {
    let mut merged =
        if persisted.len() > policy.shrink_threshold && live.len() < policy.shrink_threshold {
            debug!(
                persisted = persisted.len(),
                live = live.len(),
                "live memory shrank below threshold, patching newest exchange onto history"
            );
            let mut history = persisted.to_vec();
            if let Some(user) = last_with_role(live, TurnRole::User) {
                history.push(user.clone());
            }
            if let Some(assistant) = last_with_role(live, TurnRole::Assistant) {
                history.push(assistant.clone());
            }
            history
        } else {
            live.to_vec()
        };

    merged.sort_by_key(|turn| turn.timestamp);

    if merged.len() > policy.max_turns {
        let excess = merged.len() - policy.max_turns;
        merged.drain(..excess);
    }
    merged
}

fn last_with_role(turns: &[ChatTurn], role: TurnRole) -> Option<&ChatTurn> {
    turns.iter().rev().find(|t| t.role == role)
}
