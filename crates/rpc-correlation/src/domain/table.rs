//! Correlation table: outstanding calls keyed by `RpcId`.
//!
//! All mutations go through one exclusive lock, so a record removed by the
//! receive path can never also be returned by a sweep or by `clear()`.
//! Whoever gets the record out of the table is the only party allowed to
//! settle it through the normal path.

use super::correlation::RpcId;
use super::error::CorrelationError;
use super::record::{millis, MessageType, PendingCallRecord, Timestamp};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error};

/// Records removed from the table in one batch, oldest first.
///
/// Finite and one-shot: computed when the batch was taken.
pub struct SweptCalls<Req, Resp> {
    records: std::vec::IntoIter<PendingCallRecord<Req, Resp>>,
}

impl<Req, Resp> SweptCalls<Req, Resp> {
    fn oldest_first(mut records: Vec<PendingCallRecord<Req, Resp>>) -> Self {
        records.sort_by_key(|r| (r.created_at(), r.rpc_id()));
        Self {
            records: records.into_iter(),
        }
    }
}

impl<Req, Resp> Iterator for SweptCalls<Req, Resp> {
    type Item = PendingCallRecord<Req, Resp>;

    fn next(&mut self) -> Option<Self::Item> {
        self.records.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

impl<Req, Resp> ExactSizeIterator for SweptCalls<Req, Resp> {}

/// Map from correlation id to pending call.
pub struct CorrelationTable<Req, Resp> {
    calls: Mutex<HashMap<RpcId, PendingCallRecord<Req, Resp>>>,
}

impl<Req, Resp> CorrelationTable<Req, Resp> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Insert a record.
    ///
    /// A duplicate id means the allocator handed out an id that is still in
    /// flight. The old record is evicted and returned so the caller can
    /// settle it; the new record is kept.
    pub fn insert(
        &self,
        record: PendingCallRecord<Req, Resp>,
    ) -> Option<PendingCallRecord<Req, Resp>> {
        let rpc_id = record.rpc_id();
        let evicted = self.calls.lock().insert(rpc_id, record);
        if let Some(old) = &evicted {
            let err = CorrelationError::DuplicateCorrelationId { rpc_id };
            error!(
                error = %err,
                evicted_created_at = old.created_at(),
                "Evicting outstanding call"
            );
        }
        evicted
    }

    /// Atomically look up and delete. `None` if already resolved.
    pub fn remove(&self, rpc_id: RpcId) -> Option<PendingCallRecord<Req, Resp>> {
        self.calls.lock().remove(&rpc_id)
    }

    /// Remove every record whose age at `now` has reached its deadline.
    ///
    /// `timeout` applies to records without their own override.
    pub fn sweep_expired(&self, now: Timestamp, timeout: Duration) -> SweptCalls<Req, Resp> {
        let mut calls = self.calls.lock();
        let expired: Vec<RpcId> = calls
            .iter()
            .filter(|(_, record)| record.is_expired(now, timeout))
            .map(|(id, _)| *id)
            .collect();

        let removed: Vec<_> = expired.iter().filter_map(|id| calls.remove(id)).collect();
        drop(calls);

        if !removed.is_empty() {
            debug!(
                expired = removed.len(),
                now = now,
                timeout_ms = millis(timeout),
                "Swept expired calls"
            );
        }
        SweptCalls::oldest_first(removed)
    }

    /// Remove and return everything.
    pub fn clear(&self) -> SweptCalls<Req, Resp> {
        let drained: Vec<_> = self.calls.lock().drain().map(|(_, r)| r).collect();
        SweptCalls::oldest_first(drained)
    }

    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    pub fn contains(&self, rpc_id: RpcId) -> bool {
        self.calls.lock().contains_key(&rpc_id)
    }

    /// Response type the call expects, for decoder dispatch on receive.
    pub fn expected_type(&self, rpc_id: RpcId) -> Option<MessageType> {
        self.calls.lock().get(&rpc_id).map(|r| r.expected_type())
    }

    /// Creation time of the oldest outstanding call.
    pub fn oldest_created_at(&self) -> Option<Timestamp> {
        self.calls.lock().values().map(|r| r.created_at()).min()
    }
}

impl<Req, Resp> Default for CorrelationTable<Req, Resp> {
    fn default() -> Self {
        Self::new()
    }
}
