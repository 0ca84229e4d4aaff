//! # Session Teardown
//!
//! Closing or dropping a session resolves every outstanding call as
//! `SessionClosed`; nothing is left waiting.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use futures::future::join_all;
    use rpc_correlation::{CallOutcome, CorrelationConfig, MessageType, RpcSession};
    use tokio::time::timeout;

    type Session = RpcSession<u8, u8>;

    fn session() -> Session {
        rpc_telemetry::init_test_logging();
        Session::new(CorrelationConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_close_drains_all_waiters() {
        let session = Arc::new(session());
        let pending: Vec<_> = (0..10)
            .map(|_| session.register(None, None, MessageType::of::<u8>()))
            .collect();
        let waiters: Vec<_> = pending.into_iter().map(tokio::spawn).collect();

        assert_eq!(session.close(), 10);
        assert_eq!(session.pending_count(), 0);

        for outcome in join_all(waiters).await {
            assert_eq!(outcome.unwrap(), CallOutcome::SessionClosed);
        }
        assert_eq!(session.stats().closed, 10);
    }

    #[tokio::test]
    async fn test_close_skips_cancellation_callbacks() {
        let session = session();
        let fired = Arc::new(AtomicUsize::new(0));
        let pending = session.register(None, None, MessageType::of::<u8>());
        let counter = fired.clone();
        pending.on_cancel(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        session.close();
        assert_eq!(pending.await, CallOutcome::SessionClosed);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_operations_after_close() {
        let session = session();
        let existing = session.register(None, None, MessageType::of::<u8>());
        let rpc_id = existing.rpc_id();
        assert_eq!(session.close(), 1);
        assert_eq!(session.close(), 0);

        assert!(!session.deliver(rpc_id, 1));
        assert!(!session.cancel(rpc_id));
        let late = session.register(None, None, MessageType::of::<u8>());
        assert_eq!(late.await, CallOutcome::SessionClosed);
        assert_eq!(existing.await, CallOutcome::SessionClosed);
        assert!(!session.start_sweeper());
    }

    #[tokio::test]
    async fn test_drop_session_wakes_waiters() {
        let session = session();
        let pending = session.register(None, None, MessageType::of::<u8>());
        let waiter = tokio::spawn(pending);

        tokio::task::yield_now().await;
        drop(session);

        let outcome = timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter left hanging")
            .unwrap();
        assert_eq!(outcome, CallOutcome::SessionClosed);
    }

    #[tokio::test]
    async fn test_shutdown_stops_sweeper() {
        let session = session();
        assert!(session.start_sweeper());
        let _pending = session.register(None, None, MessageType::of::<u8>());

        let drained = timeout(Duration::from_secs(1), session.shutdown())
            .await
            .expect("sweeper did not stop");
        assert_eq!(drained, 1);
        assert!(session.is_closed());
    }
}
