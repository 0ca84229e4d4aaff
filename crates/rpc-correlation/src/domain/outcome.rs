//! Terminal outcomes of a pending call.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The value a call's completion handle is settled with.
///
/// Timeouts, cancellation and teardown are delivered as values, never as
/// panics, so an awaiting caller always resumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome<Resp> {
    /// A response arrived for the call.
    Response(Resp),
    /// The sweeper found the call past its deadline.
    Timeout { elapsed: Duration },
    /// The owner of the call cancelled it.
    Cancelled,
    /// The session was torn down while the call was outstanding.
    SessionClosed,
    /// The transport refused the request.
    SendFailed(String),
}

impl<Resp> CallOutcome<Resp> {
    pub fn is_response(&self) -> bool {
        matches!(self, CallOutcome::Response(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CallOutcome::Timeout { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CallOutcome::Cancelled)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, CallOutcome::SessionClosed)
    }

    /// Short label used in logs and stats.
    pub fn kind(&self) -> OutcomeKind {
        match self {
            CallOutcome::Response(_) => OutcomeKind::Response,
            CallOutcome::Timeout { .. } => OutcomeKind::Timeout,
            CallOutcome::Cancelled => OutcomeKind::Cancelled,
            CallOutcome::SessionClosed => OutcomeKind::SessionClosed,
            CallOutcome::SendFailed(_) => OutcomeKind::SendFailed,
        }
    }

    /// Convert into a `Result` for `?`-style handling by callers.
    pub fn into_result(self) -> Result<Resp, CallError> {
        match self {
            CallOutcome::Response(resp) => Ok(resp),
            CallOutcome::Timeout { elapsed } => Err(CallError::Timeout { elapsed }),
            CallOutcome::Cancelled => Err(CallError::Cancelled),
            CallOutcome::SessionClosed => Err(CallError::SessionClosed),
            CallOutcome::SendFailed(reason) => Err(CallError::SendFailed(reason)),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(Resp) -> U) -> CallOutcome<U> {
        match self {
            CallOutcome::Response(resp) => CallOutcome::Response(f(resp)),
            CallOutcome::Timeout { elapsed } => CallOutcome::Timeout { elapsed },
            CallOutcome::Cancelled => CallOutcome::Cancelled,
            CallOutcome::SessionClosed => CallOutcome::SessionClosed,
            CallOutcome::SendFailed(reason) => CallOutcome::SendFailed(reason),
        }
    }
}

/// Discriminant of [`CallOutcome`] without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Response,
    Timeout,
    Cancelled,
    SessionClosed,
    SendFailed,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OutcomeKind::Response => "response",
            OutcomeKind::Timeout => "timeout",
            OutcomeKind::Cancelled => "cancelled",
            OutcomeKind::SessionClosed => "session_closed",
            OutcomeKind::SendFailed => "send_failed",
        };
        f.write_str(label)
    }
}

/// Non-response outcomes as an error type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CallError {
    #[error("call timed out after {}ms", elapsed.as_millis())]
    Timeout { elapsed: Duration },

    #[error("call cancelled")]
    Cancelled,

    #[error("session closed")]
    SessionClosed,

    #[error("send failed: {0}")]
    SendFailed(String),
}
