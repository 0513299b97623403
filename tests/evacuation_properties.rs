//! Property tests for the evacuation coordinator.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use proptest::prelude::*;

use minewatch::evacuation::Outcome;
use minewatch::{EvacuationCoordinator, EvacuationState, RiskPrediction};

#[derive(Debug, Clone)]
enum Op {
    Predict { high: bool, confidence: f64 },
    Acknowledge,
    Resolve,
    SetEnabled(bool),
    ClearHistory,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (any::<bool>(), 0.0f64..=1.0).prop_map(|(high, confidence)| Op::Predict { high, confidence }),
        2 => Just(Op::Acknowledge),
        1 => Just(Op::Resolve),
        1 => any::<bool>().prop_map(Op::SetEnabled),
        1 => Just(Op::ClearHistory),
    ]
}

proptest! {
    #[test]
    fn at_most_one_active_event(ops in prop::collection::vec(op(), 0..64)) {
        let coordinator = EvacuationCoordinator::new();
        let triggers = Arc::new(AtomicUsize::new(0));
        let t = triggers.clone();
        coordinator.on_evacuation_triggered(move || {
            t.fetch_add(1, Ordering::SeqCst);
        });

        let mut expected_triggers = 0;
        for op in ops {
            match op {
                Op::Predict { high, confidence } => {
                    let outcome = coordinator.process_prediction(&RiskPrediction::new(high, confidence, vec![]));
                    if matches!(outcome, Outcome::Triggered(_)) {
                        prop_assert!(high && confidence >= 0.7);
                        expected_triggers += 1;
                    }
                }
                Op::Acknowledge => { coordinator.acknowledge(); }
                Op::Resolve => { coordinator.resolve(); }
                Op::SetEnabled(flag) => coordinator.set_enabled(flag),
                Op::ClearHistory => coordinator.clear_history(),
            }

            let history = coordinator.history();
            let active: Vec<_> = history.iter().filter(|e| e.state.is_active()).collect();
            prop_assert!(active.len() <= 1);

            match coordinator.current() {
                Some(current) => {
                    prop_assert!(current.state != EvacuationState::Resolved);
                    prop_assert_eq!(active.len(), 1);
                    prop_assert_eq!(&active[0].id, &current.id);
                }
                None => prop_assert!(active.is_empty()),
            }

            let stats = coordinator.statistics();
            prop_assert_eq!(stats.total, history.len());
            prop_assert_eq!(stats.triggered + stats.acknowledged + stats.resolved, stats.total);
        }

        prop_assert_eq!(triggers.load(Ordering::SeqCst), expected_triggers);
    }

    #[test]
    fn history_ids_are_unique(count in 1usize..20) {
        let coordinator = EvacuationCoordinator::new();
        for _ in 0..count {
            coordinator.process_prediction(&RiskPrediction::new(true, 0.9, vec![]));
            coordinator.resolve();
        }

        let mut ids: Vec<_> = coordinator.history().into_iter().map(|e| e.id).collect();
        prop_assert_eq!(ids.len(), count);
        ids.sort();
        ids.dedup();
        prop_assert_eq!(ids.len(), count);
    }
}
