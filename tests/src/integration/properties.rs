//! # Operation Sequence Properties
//!
//! Random interleavings of register, deliver, cancel, clock advance and
//! sweep, checked against a simple model of which path settles each call.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use proptest::prelude::*;
    use rpc_correlation::{
        CorrelationConfig, ManualClock, MessageType, OutcomeKind, PendingCall, RpcId, RpcSession,
        SequentialIdAllocator,
    };

    const TIMEOUT_MS: u64 = 100;

    #[derive(Debug, Clone)]
    enum Op {
        Register,
        Deliver(usize),
        Cancel(usize),
        Stray(u32),
        Advance(u64),
        Sweep,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => Just(Op::Register),
            2 => any::<usize>().prop_map(Op::Deliver),
            1 => any::<usize>().prop_map(Op::Cancel),
            1 => (10_000u32..20_000).prop_map(Op::Stray),
            2 => (1u64..80).prop_map(Op::Advance),
            1 => Just(Op::Sweep),
        ]
    }

    struct Tracked {
        pending: PendingCall<u32>,
        created_at: u64,
        settled_by: Option<OutcomeKind>,
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn test_every_call_settled_exactly_once(ops in proptest::collection::vec(op(), 1..80)) {
            let clock = Arc::new(ManualClock::new(0));
            let config = CorrelationConfig::default()
                .with_call_timeout(Duration::from_millis(TIMEOUT_MS))
                .with_sweep_interval(Duration::from_millis(10));
            let session = RpcSession::<(), u32>::with_collaborators(
                config,
                Arc::new(SequentialIdAllocator::new()),
                clock.clone(),
            )
            .unwrap();
            let sweeper = session.sweeper();

            let mut now = 0u64;
            let mut calls: Vec<Tracked> = Vec::new();

            for op in ops {
                match op {
                    Op::Register => {
                        let pending = session.register(None, None, MessageType::of::<u32>());
                        calls.push(Tracked { pending, created_at: now, settled_by: None });
                    }
                    Op::Deliver(i) if !calls.is_empty() => {
                        let len = calls.len();
                        let call = &mut calls[i % len];
                        let delivered = session.deliver(call.pending.rpc_id(), 1);
                        prop_assert_eq!(delivered, call.settled_by.is_none());
                        if delivered {
                            call.settled_by = Some(OutcomeKind::Response);
                        }
                    }
                    Op::Cancel(i) if !calls.is_empty() => {
                        let len = calls.len();
                        let call = &mut calls[i % len];
                        let cancelled = session.cancel(call.pending.rpc_id());
                        prop_assert_eq!(cancelled, call.settled_by.is_none());
                        if cancelled {
                            call.settled_by = Some(OutcomeKind::Cancelled);
                        }
                    }
                    Op::Stray(id) => {
                        prop_assert!(!session.deliver(RpcId::new(id), 0));
                    }
                    Op::Advance(ms) => {
                        now += ms;
                        clock.set(now);
                    }
                    Op::Sweep => {
                        let mut expected = 0;
                        for call in calls.iter_mut() {
                            if call.settled_by.is_none() && now - call.created_at >= TIMEOUT_MS {
                                call.settled_by = Some(OutcomeKind::Timeout);
                                expected += 1;
                            }
                        }
                        prop_assert_eq!(sweeper.sweep_once().unwrap(), expected);
                    }
                    Op::Deliver(_) | Op::Cancel(_) => {}
                }
            }

            let open = calls.iter().filter(|c| c.settled_by.is_none()).count();
            prop_assert_eq!(session.pending_count(), open);
            prop_assert_eq!(session.close(), open);

            for call in calls.iter_mut() {
                let expected = call.settled_by.unwrap_or(OutcomeKind::SessionClosed);
                let outcome = call.pending.try_outcome();
                prop_assert_eq!(outcome.map(|o| o.kind()), Some(expected));
            }

            let stats = session.stats();
            prop_assert_eq!(stats.registered as usize, calls.len());
            prop_assert_eq!(stats.settled() as usize, calls.len());
        }
    }
}
