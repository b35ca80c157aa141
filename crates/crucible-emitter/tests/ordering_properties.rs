//! Property tests for dispatch ordering

use crucible_emitter::{EventEmitter, Listener, Pattern};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::cmp::Reverse;
use std::sync::Arc;

/// Register one listener per priority (alternating literal and regex
/// patterns, split across a root and a used emitter) and return the order
/// in which they ran.
fn run_order(priorities: &[i32], compose: bool) -> Vec<usize> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    let root = EventEmitter::<()>::new();
    let used = EventEmitter::<()>::new();
    root.use_emitter(&used);
    let order = Arc::new(Mutex::new(Vec::new()));

    for (index, &priority) in priorities.iter().enumerate() {
        let target = if compose && index % 3 == 2 { &used } else { &root };
        let pattern = if index % 2 == 0 {
            Pattern::from("prop:event")
        } else {
            Pattern::regex("^prop:(.*)$").unwrap()
        };
        let order = Arc::clone(&order);
        target.on_with_priority(
            pattern,
            Listener::from_fn(move |_| order.lock().push(index)),
            priority,
        );
    }

    let result = runtime.block_on(root.emit("prop:event", ())).unwrap();
    assert_eq!(result.listeners_run, priorities.len());

    let order = order.lock().clone();
    order
}

fn expected_order(priorities: &[i32]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..priorities.len()).collect();
    indices.sort_by_key(|&i| (Reverse(priorities[i]), i));
    indices
}

proptest! {
    #[test]
    fn prop_priority_then_registration_order(
        priorities in prop::collection::vec(-5i32..5, 1..24)
    ) {
        prop_assert_eq!(run_order(&priorities, false), expected_order(&priorities));
    }

    #[test]
    fn prop_composition_is_transparent_to_ordering(
        priorities in prop::collection::vec(-5i32..5, 1..24)
    ) {
        prop_assert_eq!(run_order(&priorities, true), expected_order(&priorities));
    }

    #[test]
    fn prop_distinct_priorities_strictly_descend(
        priorities in prop::collection::hash_set(-1000i32..1000, 1..16)
    ) {
        let priorities: Vec<i32> = priorities.into_iter().collect();
        let ran: Vec<i32> = run_order(&priorities, true)
            .into_iter()
            .map(|i| priorities[i])
            .collect();
        prop_assert!(ran.windows(2).all(|pair| pair[0] > pair[1]));
    }
}
