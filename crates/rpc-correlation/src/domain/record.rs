//! Pending call record.

use super::completion::CompletionHandle;
use super::correlation::{RouteId, RpcId};
use super::outcome::CallOutcome;
use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

/// Milliseconds on the session's monotonic clock.
pub type Timestamp = u64;

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Tag for the kind of response a call expects.
///
/// Opaque to the core beyond identity: two tags are equal iff they name the
/// same Rust type. The receive path uses it to pick a decoder.
#[derive(Clone, Copy)]
pub struct MessageType {
    id: TypeId,
    name: &'static str,
}

impl MessageType {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for MessageType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MessageType {}

impl Hash for MessageType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// One outstanding outbound call.
///
/// Fields are fixed at construction. The record owns exactly one completion
/// handle; whoever removes the record from the table settles it.
pub struct PendingCallRecord<Req, Resp> {
    rpc_id: RpcId,
    route_id: Option<RouteId>,
    created_at: Timestamp,
    expected_type: MessageType,
    request: Option<Arc<Req>>,
    timeout: Option<Duration>,
    completion: CompletionHandle<CallOutcome<Resp>>,
}

impl<Req, Resp> PendingCallRecord<Req, Resp> {
    /// Record for a call that only declares its response type.
    pub fn new(
        rpc_id: RpcId,
        expected_type: MessageType,
        created_at: Timestamp,
        completion: CompletionHandle<CallOutcome<Resp>>,
    ) -> Self {
        Self {
            rpc_id,
            route_id: None,
            created_at,
            expected_type,
            request: None,
            timeout: None,
            completion,
        }
    }

    /// Attach the outbound request.
    #[must_use]
    pub fn with_request(mut self, request: Arc<Req>) -> Self {
        self.request = Some(request);
        self
    }

    /// Attach a routing target. `None` keeps the call unrouted.
    #[must_use]
    pub fn with_route(mut self, route_id: Option<RouteId>) -> Self {
        self.route_id = route_id;
        self
    }

    /// Override the sweeper's deadline for this call only.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn rpc_id(&self) -> RpcId {
        self.rpc_id
    }

    pub fn route_id(&self) -> Option<RouteId> {
        self.route_id
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn expected_type(&self) -> MessageType {
        self.expected_type
    }

    pub fn request(&self) -> Option<&Arc<Req>> {
        self.request.as_ref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn completion(&self) -> &CompletionHandle<CallOutcome<Resp>> {
        &self.completion
    }

    /// Time spent pending as of `now`. Saturates on clock regression.
    pub fn elapsed(&self, now: Timestamp) -> Duration {
        Duration::from_millis(now.saturating_sub(self.created_at))
    }

    /// Whether the call is past its deadline at `now`.
    ///
    /// `default_timeout` applies unless the record carries its own.
    pub fn is_expired(&self, now: Timestamp, default_timeout: Duration) -> bool {
        self.elapsed(now) >= self.timeout.unwrap_or(default_timeout)
    }

    /// Settle with a response. Returns whether this call won the settle race.
    pub fn complete(&self, response: Resp) -> bool {
        self.completion.try_settle(CallOutcome::Response(response))
    }

    /// Settle with `outcome` unless already settled.
    pub fn settle(&self, outcome: CallOutcome<Resp>) -> bool {
        self.completion.try_settle(outcome)
    }
}

impl<Req, Resp> fmt::Debug for PendingCallRecord<Req, Resp> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCallRecord")
            .field("rpc_id", &self.rpc_id)
            .field("route_id", &self.route_id)
            .field("created_at", &self.created_at)
            .field("expected_type", &self.expected_type)
            .field("has_request", &self.request.is_some())
            .field("timeout", &self.timeout)
            .field("completion", &self.completion)
            .finish()
    }
}
