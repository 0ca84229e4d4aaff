//! Outbound (Driven) ports for the correlation core.
//!
//! The core never performs I/O itself. Clock reads and the actual network
//! send/receive are delegated to these traits.

use crate::domain::{millis, CorrelationError, RouteId, RpcId, Timestamp, TransportError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Current reading in milliseconds.
    fn now(&self) -> Result<Timestamp, CorrelationError>;
}

/// Milliseconds elapsed since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    fn now(&self) -> Result<Timestamp, CorrelationError> {
        Ok(millis(self.origin.elapsed()))
    }
}

/// Manually driven clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    time: AtomicU64,
    unavailable: AtomicBool,
}

impl ManualClock {
    pub fn new(initial: Timestamp) -> Self {
        Self {
            time: AtomicU64::new(initial),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.time.fetch_add(millis(by), Ordering::SeqCst);
    }

    pub fn set(&self, time: Timestamp) {
        self.time.store(time, Ordering::SeqCst);
    }

    /// Make subsequent reads fail until re-enabled.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> Result<Timestamp, CorrelationError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CorrelationError::ClockUnavailable(
                "manual clock disabled".into(),
            ));
        }
        Ok(self.time.load(Ordering::SeqCst))
    }
}

/// A request handed to the transport.
#[derive(Debug)]
pub struct OutboundRequest<Req> {
    pub rpc_id: RpcId,
    pub route_id: Option<RouteId>,
    pub request: Arc<Req>,
}

impl<Req> Clone for OutboundRequest<Req> {
    fn clone(&self) -> Self {
        Self {
            rpc_id: self.rpc_id,
            route_id: self.route_id,
            request: Arc::clone(&self.request),
        }
    }
}

/// A response delivered by the transport, keyed by correlation id.
#[derive(Debug, Clone)]
pub struct InboundResponse<Resp> {
    pub rpc_id: RpcId,
    pub response: Resp,
}

/// Sending half of the external transport.
#[async_trait]
pub trait RequestTransport<Req>: Send + Sync {
    /// Hand a request to the network.
    async fn send(&self, request: OutboundRequest<Req>) -> Result<(), TransportError>;
}

/// Receiving half of the external transport.
#[async_trait]
pub trait ResponseSource<Resp>: Send + Sync {
    /// Receive next response (waits until available).
    ///
    /// `Err(TransportError::ChannelClosed)` ends the listener loop.
    async fn receive(&self) -> Result<InboundResponse<Resp>, TransportError>;
}
