//! Correlation core error types.
//!
//! None of these are delivered to an awaiting caller as a failure of the
//! call itself; callers always receive a [`CallOutcome`](super::CallOutcome).

use super::correlation::RpcId;
use thiserror::Error;

/// Internal error conditions of the correlation core.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CorrelationError {
    /// An id was inserted while a record with the same id was outstanding.
    #[error("correlation id {rpc_id} is already outstanding")]
    DuplicateCorrelationId { rpc_id: RpcId },

    /// The time source could not be read.
    #[error("clock unavailable: {0}")]
    ClockUnavailable(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Configuration validation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("invalid sweep interval: {0}")]
    InvalidInterval(String),
}

/// Failure of the external transport to accept a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("channel closed")]
    ChannelClosed,

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}
