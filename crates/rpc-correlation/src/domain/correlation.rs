//! Correlation and routing identifiers.
//!
//! `RpcId` links an outbound request to its eventual response. Ids are issued
//! by an injectable [`IdAllocator`] so that each session (and each test) owns
//! its own counter instead of sharing process-wide state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Correlation id of one outstanding call.
///
/// Zero is reserved and never issued by [`SequentialIdAllocator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RpcId(u32);

impl RpcId {
    /// Reserved "no id" value.
    pub const NONE: RpcId = RpcId(0);

    /// Wrap a raw id received from the wire.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw value for encoding.
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Whether this is the reserved zero id.
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for RpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for RpcId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// Logical destination (actor/entity) of a routed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteId(i64);

impl RouteId {
    /// Returns `None` for zero, which means "no routing target".
    pub const fn new(raw: i64) -> Option<Self> {
        if raw == 0 {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of correlation ids for one session.
pub trait IdAllocator: Send + Sync {
    /// Issue the next id. Must not return [`RpcId::NONE`].
    fn next_id(&self) -> RpcId;
}

/// Monotonic `u32` counter that wraps silently and skips zero.
///
/// Uniqueness among outstanding calls relies on the counter range: a call
/// would have to stay pending for 2^32 - 1 subsequent allocations before its
/// id is reissued.
#[derive(Debug)]
pub struct SequentialIdAllocator {
    next: AtomicU32,
}

impl SequentialIdAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Start issuing at `first` (zero is bumped to one on issue).
    #[must_use]
    pub fn starting_at(first: u32) -> Self {
        Self {
            next: AtomicU32::new(first),
        }
    }
}

impl Default for SequentialIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator for SequentialIdAllocator {
    fn next_id(&self) -> RpcId {
        loop {
            // fetch_add wraps on overflow
            let id = self.next.fetch_add(1, Ordering::Relaxed);
            if id != 0 {
                return RpcId(id);
            }
        }
    }
}
