//! # Settlement Races
//!
//! The receive path, the owner's cancel and the timeout sweeper all try to
//! settle the same call. Exactly one wins and the awaiter sees exactly that
//! outcome.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    use rpc_correlation::{
        CallOutcome, CorrelationConfig, ManualClock, MessageType, OutcomeKind, RpcSession,
        SequentialIdAllocator,
    };

    type Session = RpcSession<(), u32>;

    fn session_with_clock() -> (Arc<Session>, Arc<ManualClock>) {
        rpc_telemetry::init_test_logging();
        let clock = Arc::new(ManualClock::new(0));
        let config = CorrelationConfig::default()
            .with_call_timeout(Duration::from_millis(100))
            .with_sweep_interval(Duration::from_millis(10));
        let session = Session::with_collaborators(
            config,
            Arc::new(SequentialIdAllocator::new()),
            clock.clone(),
        )
        .unwrap();
        (Arc::new(session), clock)
    }

    #[test]
    fn test_response_cancel_timeout_single_winner() {
        let (session, clock) = session_with_clock();
        let sweeper = session.sweeper();
        let mut wins = [0usize; 3];

        for round in 0..200u32 {
            let cancel_runs = Arc::new(AtomicUsize::new(0));
            let mut pending = session.register(None, None, MessageType::of::<u32>());
            let runs = cancel_runs.clone();
            pending.on_cancel(move || {
                runs.fetch_add(1, Ordering::SeqCst);
            });
            let rpc_id = pending.rpc_id();
            clock.advance(Duration::from_millis(150));

            let barrier = Arc::new(Barrier::new(3));
            let deliver = {
                let (session, barrier) = (session.clone(), barrier.clone());
                thread::spawn(move || {
                    barrier.wait();
                    session.deliver(rpc_id, round)
                })
            };
            let cancel = {
                let (session, barrier) = (session.clone(), barrier.clone());
                thread::spawn(move || {
                    barrier.wait();
                    session.cancel(rpc_id)
                })
            };
            barrier.wait();
            let swept = sweeper.sweep_once().unwrap();

            let delivered = deliver.join().unwrap();
            let cancelled = cancel.join().unwrap();
            assert_eq!(delivered as usize + cancelled as usize + swept, 1);

            let outcome = pending.try_outcome().expect("call left unsettled");
            match outcome {
                CallOutcome::Response(v) => {
                    assert!(delivered);
                    assert_eq!(*v, round);
                    wins[0] += 1;
                }
                CallOutcome::Cancelled => {
                    assert!(cancelled);
                    wins[1] += 1;
                }
                CallOutcome::Timeout { elapsed } => {
                    assert_eq!(swept, 1);
                    assert!(*elapsed >= Duration::from_millis(100));
                    wins[2] += 1;
                }
                other => panic!("unexpected outcome {other:?}"),
            }
            assert_eq!(cancel_runs.load(Ordering::SeqCst), usize::from(cancelled));
            assert!(!session.is_pending(rpc_id));
        }

        assert_eq!(wins.iter().sum::<usize>(), 200);
        let stats = session.stats();
        assert_eq!(stats.settled(), 200);
        assert_eq!(stats.completed as usize, wins[0]);
        assert_eq!(stats.cancelled as usize, wins[1]);
        assert_eq!(stats.timeouts as usize, wins[2]);
    }

    #[test]
    fn test_late_response_after_timeout_is_unmatched() {
        let (session, clock) = session_with_clock();
        let mut pending = session.register(None, None, MessageType::of::<u32>());
        let rpc_id = pending.rpc_id();

        clock.advance(Duration::from_millis(150));
        assert_eq!(session.sweeper().sweep_once().unwrap(), 1);

        assert!(!session.deliver(rpc_id, 1));
        assert!(pending.try_outcome().unwrap().is_timeout());
        assert_eq!(session.stats().unmatched, 1);
    }

    #[test]
    fn test_cancel_after_response_is_noop() {
        let (session, _clock) = session_with_clock();
        let mut pending = session.register(None, None, MessageType::of::<u32>());
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        pending.on_cancel(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(session.deliver(pending.rpc_id(), 7));
        assert!(!session.cancel(pending.rpc_id()));
        assert_eq!(pending.try_outcome(), Some(&CallOutcome::Response(7)));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_many_deliveries_race_one_call() {
        let (session, _clock) = session_with_clock();
        let pending = session.register(None, None, MessageType::of::<u32>());
        let rpc_id = pending.rpc_id();

        let tasks: Vec<_> = (0..16u32)
            .map(|v| {
                let session = session.clone();
                tokio::spawn(async move { session.deliver(rpc_id, v) })
            })
            .collect();

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(pending.await.kind(), OutcomeKind::Response);

        let stats = session.stats();
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.unmatched, 15);
    }
}
