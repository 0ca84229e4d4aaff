//! Response listener: pumps the transport's receive side into a session.

use crate::domain::{millis, TransportError};
use crate::ports::ResponseSource;
use crate::service::session::RpcSession;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, warn};

/// Pause after a failed receive before trying again.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Consecutive failed receives after which the listener gives up.
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 10;

/// Loop that delivers every inbound response to its session.
pub struct ResponseListener<Req, Resp> {
    session: Arc<RpcSession<Req, Resp>>,
    source: Arc<dyn ResponseSource<Resp>>,
    retry_delay: Duration,
    max_consecutive_failures: u32,
}

impl<Req, Resp> ResponseListener<Req, Resp>
where
    Req: Send + Sync + 'static,
    Resp: Send + 'static,
{
    pub fn new(session: Arc<RpcSession<Req, Resp>>, source: Arc<dyn ResponseSource<Resp>>) -> Self {
        Self {
            session,
            source,
            retry_delay: DEFAULT_RETRY_DELAY,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }

    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    #[must_use]
    pub fn with_max_consecutive_failures(mut self, max: u32) -> Self {
        self.max_consecutive_failures = max;
        self
    }

    /// Run until the source reports its channel closed, or until it fails
    /// `max_consecutive_failures` times in a row.
    ///
    /// Returns how many responses matched an outstanding call.
    pub async fn run(self) -> u64 {
        let mut matched = 0;
        let mut failures = 0u32;
        loop {
            match self.source.receive().await {
                Ok(inbound) => {
                    failures = 0;
                    if self.session.deliver(inbound.rpc_id, inbound.response) {
                        matched += 1;
                    }
                }
                Err(TransportError::ChannelClosed) => {
                    warn!(
                        session_id = %self.session.session_id(),
                        "Response channel closed, stopping listener"
                    );
                    break;
                }
                Err(e) => {
                    failures += 1;
                    if failures >= self.max_consecutive_failures {
                        error!(
                            session_id = %self.session.session_id(),
                            error = %e,
                            failures = failures,
                            "Response source keeps failing, stopping listener"
                        );
                        break;
                    }
                    warn!(
                        error = %e,
                        failures = failures,
                        retry_in_ms = millis(self.retry_delay),
                        "Error receiving response, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
        matched
    }

    pub fn spawn(self) -> JoinHandle<u64> {
        tokio::spawn(self.run())
    }
}
