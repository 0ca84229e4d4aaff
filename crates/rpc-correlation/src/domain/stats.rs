//! Counters for a session's call lifecycle.

use super::outcome::OutcomeKind;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Lifecycle counters, updated lock-free.
#[derive(Debug, Default)]
pub struct CorrelationStats {
    pub total_registered: AtomicU64,
    pub total_completed: AtomicU64,
    pub total_timeouts: AtomicU64,
    pub total_cancelled: AtomicU64,
    pub total_closed: AtomicU64,
    pub total_send_failures: AtomicU64,
    /// Responses that matched no outstanding call.
    pub total_unmatched: AtomicU64,
    /// Ids inserted while still outstanding.
    pub total_duplicates: AtomicU64,
}

impl CorrelationStats {
    /// Count one settled call by how it ended.
    pub fn record_outcome(&self, kind: OutcomeKind) {
        let counter = match kind {
            OutcomeKind::Response => &self.total_completed,
            OutcomeKind::Timeout => &self.total_timeouts,
            OutcomeKind::Cancelled => &self.total_cancelled,
            OutcomeKind::SessionClosed => &self.total_closed,
            OutcomeKind::SendFailed => &self.total_send_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            registered: self.total_registered.load(Ordering::Relaxed),
            completed: self.total_completed.load(Ordering::Relaxed),
            timeouts: self.total_timeouts.load(Ordering::Relaxed),
            cancelled: self.total_cancelled.load(Ordering::Relaxed),
            closed: self.total_closed.load(Ordering::Relaxed),
            send_failures: self.total_send_failures.load(Ordering::Relaxed),
            unmatched: self.total_unmatched.load(Ordering::Relaxed),
            duplicates: self.total_duplicates.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`CorrelationStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub registered: u64,
    pub completed: u64,
    pub timeouts: u64,
    pub cancelled: u64,
    pub closed: u64,
    pub send_failures: u64,
    pub unmatched: u64,
    pub duplicates: u64,
}

impl StatsSnapshot {
    /// Calls settled by any path.
    pub fn settled(&self) -> u64 {
        self.completed + self.timeouts + self.cancelled + self.closed + self.send_failures
    }
}
