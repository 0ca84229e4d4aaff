//! # RPC Correlation Core
//!
//! Tracks in-flight outbound RPC calls and matches asynchronous responses to
//! the calls that produced them.
//!
//! ## Purpose
//!
//! Every outbound call gets a correlation id (`RpcId`) and a pending record
//! holding a single-assignment completion handle. The call is then settled
//! exactly once by whichever of these gets there first:
//!
//! | Source | Entry point | Outcome |
//! |--------|-------------|---------|
//! | Receive path | `RpcSession::deliver()` | `CallOutcome::Response` |
//! | Timeout sweeper | `TimeoutSweeper::sweep_once()` | `CallOutcome::Timeout` |
//! | Call owner | `RpcSession::cancel()` | `CallOutcome::Cancelled` |
//! | Session teardown | `RpcSession::close()` | `CallOutcome::SessionClosed` |
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Record removed at most once | `domain/table.rs` - single table lock |
//! | Handle settled at most once | `domain/completion.rs` - CAS in `claim()` |
//! | Timeout never runs cancel callbacks | `domain/completion.rs` - `try_settle()` discards |
//! | No awaiter left hanging on teardown | `service/session.rs` - `close()` + `Drop` |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      OUTER LAYER                                │
//! │  adapters/ - in-memory channel transport                        │
//! │  service/  - RpcSession, TimeoutSweeper, ResponseListener       │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements / uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MIDDLE LAYER                               │
//! │  ports/outbound.rs - TimeSource, RequestTransport,              │
//! │                      ResponseSource                             │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      INNER LAYER                                │
//! │  domain/completion.rs  - CompletionHandle, Completion           │
//! │  domain/record.rs      - PendingCallRecord, MessageType         │
//! │  domain/table.rs       - CorrelationTable                       │
//! │  domain/correlation.rs - RpcId, RouteId, IdAllocator            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rpc_correlation::{CorrelationConfig, MessageType, RpcSession};
//!
//! let session = Arc::new(RpcSession::<Request, Response>::new(CorrelationConfig::from_env())?);
//! session.start_sweeper();
//!
//! let outcome = session
//!     .call(&transport, None, request, MessageType::of::<Response>())
//!     .await;
//!
//! // On session teardown
//! session.shutdown().await;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports for public API
pub use adapters::{ChannelResponseSource, ChannelTransport};
pub use domain::{
    Abandoned, CallError, CallOutcome, Completion, CompletionHandle, ConfigError,
    CorrelationConfig, CorrelationError, CorrelationStats, CorrelationTable, IdAllocator,
    MessageType, OutcomeKind, PendingCallRecord, RouteId, RpcId, SequentialIdAllocator,
    StatsSnapshot, SweptCalls, Timestamp, TransportError, WeakCompletionHandle,
    DEFAULT_CALL_TIMEOUT_MS, DEFAULT_SWEEP_INTERVAL_MS,
};
pub use ports::{
    InboundResponse, ManualClock, MonotonicClock, OutboundRequest, RequestTransport,
    ResponseSource, TimeSource,
};
pub use service::{PendingCall, ResponseListener, RpcSession, SweeperHandle, TimeoutSweeper};
