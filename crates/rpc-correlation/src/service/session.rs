//! RPC session: the boundary the surrounding RPC layer talks to.
//!
//! Flow:
//! 1. `register()` allocates an `RpcId`, inserts a `PendingCallRecord` and
//!    returns a `PendingCall` to await
//! 2. The caller sends the request through its transport (or uses `call()`)
//! 3. The receive path calls `deliver()` with the response
//! 4. The sweeper, `cancel()` or `close()` settle whatever is left
//!
//! Every path first removes the record from the table, so at most one of
//! them ever settles a given call.

use crate::domain::{
    millis, Abandoned, CallOutcome, Completion, CompletionHandle, CorrelationConfig,
    CorrelationError, CorrelationStats, CorrelationTable, IdAllocator, MessageType, OutcomeKind,
    PendingCallRecord, RouteId, RpcId, SequentialIdAllocator, StatsSnapshot, WeakCompletionHandle,
};
use crate::ports::{MonotonicClock, OutboundRequest, RequestTransport, TimeSource};
use crate::service::sweeper::{SweeperHandle, TimeoutSweeper};
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Caller's side of one registered call.
///
/// Resolves to the call's [`CallOutcome`]. Never hangs once the session is
/// closed or dropped. An outcome observed through
/// [`try_outcome`](Self::try_outcome) is kept, so later checks and the final
/// `.await` all see the same value.
pub struct PendingCall<Resp> {
    rpc_id: RpcId,
    handle: WeakCompletionHandle<CallOutcome<Resp>>,
    completion: Completion<CallOutcome<Resp>>,
    settled: Option<CallOutcome<Resp>>,
}

impl<Resp> PendingCall<Resp> {
    pub fn rpc_id(&self) -> RpcId {
        self.rpc_id
    }

    /// Run `callback` if this call is cancelled while still pending.
    pub fn on_cancel<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Some(handle) = self.handle.upgrade() {
            handle.register_cancellation(callback);
        }
    }

    /// Wait for the outcome.
    pub async fn outcome(self) -> CallOutcome<Resp> {
        self.await
    }

    /// Outcome if already settled, without suspending.
    pub fn try_outcome(&mut self) -> Option<&CallOutcome<Resp>> {
        if self.settled.is_none() {
            let result = self.completion.try_take()?;
            self.settled = Some(result.unwrap_or(CallOutcome::SessionClosed));
        }
        self.settled.as_ref()
    }
}

// No field is structurally pinned.
impl<Resp> Unpin for PendingCall<Resp> {}

impl<Resp> Future for PendingCall<Resp> {
    type Output = CallOutcome<Resp>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(outcome) = self.settled.take() {
            return Poll::Ready(outcome);
        }
        // A handle dropped unsettled can only mean the session went away.
        Pin::new(&mut self.completion)
            .poll(cx)
            .map(|res: Result<_, Abandoned>| res.unwrap_or(CallOutcome::SessionClosed))
    }
}

/// Correlation state for one networking session.
pub struct RpcSession<Req, Resp> {
    session_id: Uuid,
    config: CorrelationConfig,
    table: Arc<CorrelationTable<Req, Resp>>,
    allocator: Arc<dyn IdAllocator>,
    clock: Arc<dyn TimeSource>,
    stats: Arc<CorrelationStats>,
    closed: AtomicBool,
    sweeper: Mutex<Option<SweeperHandle>>,
}

impl<Req, Resp> RpcSession<Req, Resp>
where
    Req: Send + Sync + 'static,
    Resp: Send + 'static,
{
    /// Session with a fresh sequential allocator and the monotonic clock.
    pub fn new(config: CorrelationConfig) -> Result<Self, CorrelationError> {
        Self::with_collaborators(
            config,
            Arc::new(SequentialIdAllocator::new()),
            Arc::new(MonotonicClock::new()),
        )
    }

    /// Session with an injected allocator and clock.
    pub fn with_collaborators(
        config: CorrelationConfig,
        allocator: Arc<dyn IdAllocator>,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, CorrelationError> {
        config.validate()?;
        let session_id = Uuid::new_v4();

        debug!(
            session_id = %session_id,
            call_timeout_ms = config.call_timeout_ms,
            sweep_interval_ms = config.sweep_interval_ms,
            "Session opened"
        );

        Ok(Self {
            session_id,
            config,
            table: Arc::new(CorrelationTable::new()),
            allocator,
            clock,
            stats: Arc::new(CorrelationStats::default()),
            closed: AtomicBool::new(false),
            sweeper: Mutex::new(None),
        })
    }

    /// Start the timeout sweeper on the current tokio runtime.
    ///
    /// Returns `false` if one is already running or the session is closed.
    pub fn start_sweeper(&self) -> bool {
        let mut slot = self.sweeper.lock();
        if slot.is_some() || self.is_closed() {
            return false;
        }
        let sweeper = TimeoutSweeper::new(
            Arc::clone(&self.table),
            Arc::clone(&self.clock),
            Arc::clone(&self.stats),
            &self.config,
        );
        *slot = Some(sweeper.spawn());
        true
    }

    /// Sweeper for driving timeouts manually instead of on an interval.
    pub fn sweeper(&self) -> TimeoutSweeper<Req, Resp> {
        TimeoutSweeper::new(
            Arc::clone(&self.table),
            Arc::clone(&self.clock),
            Arc::clone(&self.stats),
            &self.config,
        )
    }

    /// Track a new outbound call and return the handle to await.
    pub fn register(
        &self,
        route_id: Option<RouteId>,
        request: Option<Arc<Req>>,
        expected_type: MessageType,
    ) -> PendingCall<Resp> {
        self.register_inner(route_id, request, expected_type, None)
    }

    /// Register a call expecting a response of type `R`.
    pub fn register_typed<R: 'static>(
        &self,
        route_id: Option<RouteId>,
        request: Option<Arc<Req>>,
    ) -> PendingCall<Resp> {
        self.register(route_id, request, MessageType::of::<R>())
    }

    /// Like [`register`](Self::register) with a per-call deadline.
    pub fn register_with_timeout(
        &self,
        route_id: Option<RouteId>,
        request: Option<Arc<Req>>,
        expected_type: MessageType,
        timeout: Duration,
    ) -> PendingCall<Resp> {
        self.register_inner(route_id, request, expected_type, Some(timeout))
    }

    fn register_inner(
        &self,
        route_id: Option<RouteId>,
        request: Option<Arc<Req>>,
        expected_type: MessageType,
        timeout: Option<Duration>,
    ) -> PendingCall<Resp> {
        let rpc_id = self.allocator.next_id();
        let (handle, completion) = CompletionHandle::new();
        let pending = PendingCall {
            rpc_id,
            handle: handle.downgrade(),
            completion,
            settled: None,
        };
        self.stats
            .total_registered
            .fetch_add(1, Ordering::Relaxed);

        if self.is_closed() {
            self.settle_detached(&handle, CallOutcome::SessionClosed);
            debug!(rpc_id = %rpc_id, "Register on closed session");
            return pending;
        }

        let created_at = match self.clock.now() {
            Ok(now) => now,
            Err(e) => {
                // Without a timestamp the sweeper could never expire the call.
                warn!(rpc_id = %rpc_id, error = %e, "Clock unavailable at register");
                self.settle_detached(&handle, CallOutcome::SendFailed(e.to_string()));
                return pending;
            }
        };

        let mut record = PendingCallRecord::new(rpc_id, expected_type, created_at, handle)
            .with_route(route_id);
        if let Some(request) = request {
            record = record.with_request(request);
        }
        if let Some(timeout) = timeout {
            record = record.with_timeout(timeout);
        }

        if let Some(evicted) = self.table.insert(record) {
            self.stats
                .total_duplicates
                .fetch_add(1, Ordering::Relaxed);
            if evicted.settle(CallOutcome::Cancelled) {
                self.stats.record_outcome(OutcomeKind::Cancelled);
            }
        }

        // close() may have drained the table between the check and the insert.
        if self.is_closed() {
            if let Some(record) = self.table.remove(rpc_id) {
                if record.settle(CallOutcome::SessionClosed) {
                    self.stats.record_outcome(OutcomeKind::SessionClosed);
                }
            }
            return pending;
        }

        debug!(
            rpc_id = %rpc_id,
            route_id = route_id.map(|r| r.get()),
            expected_type = %expected_type,
            "Registered pending call"
        );

        pending
    }

    /// Receive path: settle the matching call with `response`.
    ///
    /// Returns `false` for unknown or already resolved ids, which are logged
    /// and dropped.
    pub fn deliver(&self, rpc_id: RpcId, response: Resp) -> bool {
        let Some(record) = self.table.remove(rpc_id) else {
            self.stats.total_unmatched.fetch_add(1, Ordering::Relaxed);
            debug!(rpc_id = %rpc_id, "Response for unknown or resolved call");
            return false;
        };

        if !record.complete(response) {
            return false;
        }
        self.stats.record_outcome(OutcomeKind::Response);

        let elapsed_ms = self
            .clock
            .now()
            .map(|now| millis(record.elapsed(now)))
            .ok();
        debug!(
            rpc_id = %rpc_id,
            expected_type = %record.expected_type(),
            elapsed_ms = elapsed_ms,
            "Completed pending call"
        );
        true
    }

    /// Cancel an outstanding call on behalf of its owner.
    ///
    /// Runs the call's cancellation callback once and settles it as
    /// `Cancelled`. No-op if the call already resolved.
    pub fn cancel(&self, rpc_id: RpcId) -> bool {
        let Some(record) = self.table.remove(rpc_id) else {
            debug!(rpc_id = %rpc_id, "Cancel for unknown or resolved call");
            return false;
        };

        let cancelled = record.completion().cancel(CallOutcome::Cancelled);
        if cancelled {
            self.stats.record_outcome(OutcomeKind::Cancelled);
            debug!(rpc_id = %rpc_id, "Cancelled pending call");
        }
        cancelled
    }

    /// Register, send through `transport` and await the outcome.
    ///
    /// A transport failure removes the call and resolves it as `SendFailed`.
    pub async fn call<T>(
        &self,
        transport: &T,
        route_id: Option<RouteId>,
        request: Req,
        expected_type: MessageType,
    ) -> CallOutcome<Resp>
    where
        T: RequestTransport<Req> + ?Sized,
    {
        let request = Arc::new(request);
        let pending = self.register(route_id, Some(Arc::clone(&request)), expected_type);
        let rpc_id = pending.rpc_id();

        let outbound = OutboundRequest {
            rpc_id,
            route_id,
            request,
        };
        if let Err(e) = transport.send(outbound).await {
            warn!(rpc_id = %rpc_id, error = %e, "Transport send failed");
            if let Some(record) = self.table.remove(rpc_id) {
                if record.settle(CallOutcome::SendFailed(e.to_string())) {
                    self.stats.record_outcome(OutcomeKind::SendFailed);
                }
            }
        }

        pending.await
    }

    /// Teardown: drain every outstanding call and settle it `SessionClosed`.
    ///
    /// Returns the number of calls drained. Later registrations resolve
    /// immediately as `SessionClosed`.
    pub fn close(&self) -> usize {
        let first = !self.closed.swap(true, Ordering::SeqCst);

        if let Some(sweeper) = self.sweeper.lock().as_ref() {
            sweeper.signal_stop();
        }

        let mut drained = 0;
        for record in self.table.clear() {
            if record.settle(CallOutcome::SessionClosed) {
                self.stats.record_outcome(OutcomeKind::SessionClosed);
            }
            drained += 1;
        }

        if first {
            info!(
                session_id = %self.session_id,
                drained = drained,
                "Session closed"
            );
        }
        drained
    }

    /// Close and wait for the sweeper task to exit.
    pub async fn shutdown(&self) -> usize {
        let drained = self.close();
        let sweeper = self.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            sweeper.stop().await;
        }
        drained
    }

    fn settle_detached(
        &self,
        handle: &CompletionHandle<CallOutcome<Resp>>,
        outcome: CallOutcome<Resp>,
    ) {
        let kind = outcome.kind();
        if handle.try_settle(outcome) {
            self.stats.record_outcome(kind);
        }
    }
}

impl<Req, Resp> RpcSession<Req, Resp> {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn config(&self) -> &CorrelationConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn pending_count(&self) -> usize {
        self.table.len()
    }

    pub fn is_pending(&self, rpc_id: RpcId) -> bool {
        self.table.contains(rpc_id)
    }

    /// Response type expected by an outstanding call, for decoder dispatch.
    pub fn expected_type(&self, rpc_id: RpcId) -> Option<MessageType> {
        self.table.expected_type(rpc_id)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl<Req, Resp> Drop for RpcSession<Req, Resp> {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.get_mut().take() {
            sweeper.signal_stop();
        }
        let mut remaining = 0;
        for record in self.table.clear() {
            if record.settle(CallOutcome::SessionClosed) {
                self.stats.record_outcome(OutcomeKind::SessionClosed);
            }
            remaining += 1;
        }
        if remaining > 0 && !self.closed.load(Ordering::SeqCst) {
            warn!(
                session_id = %self.session_id,
                remaining = remaining,
                "Session dropped without close"
            );
        }
    }
}
