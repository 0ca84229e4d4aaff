//! Timeout sweeper: fails calls that outlive their deadline.
//!
//! Timeout is not cancellation: swept calls are settled with
//! [`CallOutcome::Timeout`] and their cancellation callbacks never run.

use crate::domain::{
    millis, CallOutcome, CorrelationConfig, CorrelationError, CorrelationStats, CorrelationTable,
    OutcomeKind,
};
use crate::ports::TimeSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Periodic scan of a correlation table.
pub struct TimeoutSweeper<Req, Resp> {
    table: Arc<CorrelationTable<Req, Resp>>,
    clock: Arc<dyn TimeSource>,
    stats: Arc<CorrelationStats>,
    timeout: Duration,
    interval: Duration,
}

impl<Req, Resp> TimeoutSweeper<Req, Resp>
where
    Req: Send + Sync + 'static,
    Resp: Send + 'static,
{
    pub fn new(
        table: Arc<CorrelationTable<Req, Resp>>,
        clock: Arc<dyn TimeSource>,
        stats: Arc<CorrelationStats>,
        config: &CorrelationConfig,
    ) -> Self {
        Self {
            table,
            clock,
            stats,
            timeout: config.call_timeout(),
            interval: config.sweep_interval(),
        }
    }

    /// Sweep once. Returns how many calls this sweep settled.
    pub fn sweep_once(&self) -> Result<usize, CorrelationError> {
        let now = self.clock.now()?;
        let mut settled = 0;

        for record in self.table.sweep_expired(now, self.timeout) {
            let elapsed = record.elapsed(now);
            if record.settle(CallOutcome::Timeout { elapsed }) {
                self.stats.record_outcome(OutcomeKind::Timeout);
                settled += 1;
                warn!(
                    rpc_id = %record.rpc_id(),
                    route_id = record.route_id().map(|r| r.get()),
                    expected_type = %record.expected_type(),
                    elapsed_ms = millis(elapsed),
                    "Call timed out"
                );
            }
        }

        Ok(settled)
    }

    /// Sweep on every interval tick until `shutdown` turns true or its
    /// sender is dropped. A failed sweep is logged and retried next tick.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.sweep_once() {
                        Ok(0) => {}
                        Ok(settled) => debug!(settled = settled, "Swept expired calls"),
                        Err(e) => warn!(error = %e, "Sweep failed, retrying next interval"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        debug!("Timeout sweeper stopped");
    }

    /// Run on the current tokio runtime.
    pub fn spawn(self) -> SweeperHandle {
        let (shutdown, rx) = watch::channel(false);
        let task = tokio::spawn(self.run(rx));
        SweeperHandle { shutdown, task }
    }
}

/// Handle to a spawned sweeper task.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Ask the loop to exit without waiting for it.
    pub fn signal_stop(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Stop the loop and wait for the task to finish.
    pub async fn stop(self) {
        self.signal_stop();
        if let Err(e) = self.task.await {
            warn!(error = %e, "Timeout sweeper task failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
