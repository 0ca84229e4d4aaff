//! # Domain Layer - Correlation Core
//!
//! Pure state and rules for tracking outstanding calls.
//!
//! ## Components
//!
//! - `correlation`: `RpcId`, `RouteId`, id allocation
//! - `completion`: single-assignment `CompletionHandle` and its awaiter
//! - `record`: `PendingCallRecord`, `MessageType`
//! - `table`: `CorrelationTable` (insert, remove, sweep, clear)
//! - `outcome`: `CallOutcome` delivered to every awaiter
//! - `config`, `error`, `stats`

pub mod completion;
pub mod config;
pub mod correlation;
pub mod error;
pub mod outcome;
pub mod record;
pub mod stats;
pub mod table;

pub use completion::{Abandoned, Completion, CompletionHandle, WeakCompletionHandle};
pub use config::{CorrelationConfig, DEFAULT_CALL_TIMEOUT_MS, DEFAULT_SWEEP_INTERVAL_MS};
pub use correlation::{IdAllocator, RouteId, RpcId, SequentialIdAllocator};
pub use error::{ConfigError, CorrelationError, TransportError};
pub use outcome::{CallError, CallOutcome, OutcomeKind};
pub use record::{millis, MessageType, PendingCallRecord, Timestamp};
pub use stats::{CorrelationStats, StatsSnapshot};
pub use table::{CorrelationTable, SweptCalls};
