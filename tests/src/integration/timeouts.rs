//! # Timeout Sweeping
//!
//! Deterministic sweeps driven by a manual clock, plus one run of the
//! background sweeper against the real monotonic clock.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use rpc_correlation::{
        CallOutcome, CorrelationConfig, CorrelationError, ManualClock, MessageType, RpcId,
        RpcSession, SequentialIdAllocator,
    };
    use tokio::time::timeout;

    type Session = RpcSession<String, String>;

    fn config(timeout_ms: u64) -> CorrelationConfig {
        CorrelationConfig::default()
            .with_call_timeout(Duration::from_millis(timeout_ms))
            .with_sweep_interval(Duration::from_millis(10))
    }

    fn manual_session(first_id: u32, clock: Arc<ManualClock>) -> Session {
        rpc_telemetry::init_test_logging();
        Session::with_collaborators(
            config(100),
            Arc::new(SequentialIdAllocator::starting_at(first_id)),
            clock,
        )
        .unwrap()
    }

    #[test]
    fn test_expired_call_swept_once() {
        let clock = Arc::new(ManualClock::new(0));
        let session = manual_session(1, clock.clone());
        let sweeper = session.sweeper();

        let mut pending = session.register(None, None, MessageType::of::<String>());
        assert_eq!(pending.rpc_id(), RpcId::new(1));

        clock.set(150);
        assert_eq!(sweeper.sweep_once().unwrap(), 1);
        assert_eq!(
            pending.try_outcome(),
            Some(&CallOutcome::Timeout {
                elapsed: Duration::from_millis(150)
            })
        );

        clock.set(200);
        assert_eq!(sweeper.sweep_once().unwrap(), 0);
        assert_eq!(session.pending_count(), 0);
    }

    #[test]
    fn test_delivered_call_never_swept() {
        let clock = Arc::new(ManualClock::new(0));
        let session = manual_session(7, clock.clone());
        let sweeper = session.sweeper();

        let mut pending = session.register(None, None, MessageType::of::<String>());
        assert_eq!(pending.rpc_id(), RpcId::new(7));
        assert!(session.deliver(RpcId::new(7), "ok".into()));

        clock.set(10_000);
        assert_eq!(sweeper.sweep_once().unwrap(), 0);
        assert_eq!(
            pending.try_outcome(),
            Some(&CallOutcome::Response("ok".to_string()))
        );
    }

    #[test]
    fn test_per_call_timeout_overrides_default() {
        let clock = Arc::new(ManualClock::new(0));
        let session = manual_session(1, clock.clone());
        let sweeper = session.sweeper();

        let mut short = session.register_with_timeout(
            None,
            None,
            MessageType::of::<String>(),
            Duration::from_millis(20),
        );
        let mut long = session.register_with_timeout(
            None,
            None,
            MessageType::of::<String>(),
            Duration::from_millis(500),
        );
        let mut default = session.register(None, None, MessageType::of::<String>());

        clock.set(50);
        assert_eq!(sweeper.sweep_once().unwrap(), 1);
        assert!(short.try_outcome().unwrap().is_timeout());

        clock.set(150);
        assert_eq!(sweeper.sweep_once().unwrap(), 1);
        assert!(default.try_outcome().unwrap().is_timeout());
        assert!(long.try_outcome().is_none());
        assert!(session.is_pending(long.rpc_id()));
    }

    #[test]
    fn test_sweep_fails_while_clock_unavailable() {
        let clock = Arc::new(ManualClock::new(0));
        let session = manual_session(1, clock.clone());
        let sweeper = session.sweeper();
        let mut pending = session.register(None, None, MessageType::of::<String>());

        clock.set(500);
        clock.set_unavailable(true);
        assert!(matches!(
            sweeper.sweep_once(),
            Err(CorrelationError::ClockUnavailable(_))
        ));
        assert!(pending.try_outcome().is_none());

        clock.set_unavailable(false);
        assert_eq!(sweeper.sweep_once().unwrap(), 1);
        assert!(pending.try_outcome().unwrap().is_timeout());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_background_sweeper_times_out_unanswered_call() {
        rpc_telemetry::init_test_logging();
        let session = Session::new(config(100)).unwrap();
        assert!(session.start_sweeper());
        assert!(!session.start_sweeper());

        let pending = session.register(None, None, MessageType::of::<String>());
        let outcome = timeout(Duration::from_secs(5), pending)
            .await
            .expect("sweeper never fired");

        match outcome {
            CallOutcome::Timeout { elapsed } => assert!(elapsed >= Duration::from_millis(100)),
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(session.stats().timeouts, 1);
        session.shutdown().await;
    }
}
