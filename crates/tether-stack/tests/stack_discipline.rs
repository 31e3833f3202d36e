//! Property test: stack discipline holds under arbitrary host behavior.
//!
//! Drives the lifecycle manager with random interleavings of pushes,
//! out-of-order host releases, and bulk promotions, checking after
//! every step that tracked values sit in allocation order and that the
//! arena pointer never strays above the newest tracked value. Every
//! run must end with an empty tracker and a fully reclaimed arena.

use proptest::prelude::*;

use tether_core::WORD_BYTES;
use tether_stack::{StackConfig, ValueStack, WrapperId};
use tether_test_utils::MockEngine;

#[derive(Clone, Copy, Debug)]
enum Op {
    /// Evaluate and wrap a value of the given word count.
    Push(usize),
    /// Release the host reference on a live wrapper (picked by seed).
    Release(usize),
    /// Bulk-promote everything to the heap.
    Promote,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (1usize..8).prop_map(Op::Push),
        3 => any::<usize>().prop_map(Op::Release),
        1 => Just(Op::Promote),
    ]
}

fn check_invariants(s: &ValueStack<MockEngine>, held: &[WrapperId]) {
    let tracked = s.tracked();
    if tracked.is_empty() {
        assert_eq!(s.arena_pointer(), s.arena_top());
    }
    // Newest first, addresses never increasing toward the head.
    for pair in tracked.windows(2) {
        let newer = s.raw_value(pair[0]).expect("tracked wrapper has a raw value");
        let older = s.raw_value(pair[1]).expect("tracked wrapper has a raw value");
        assert!(newer.addr() <= older.addr());
    }
    // The pointer covers every tracked value.
    if let Some(&head) = tracked.first() {
        let head_value = s.raw_value(head).expect("tracked wrapper has a raw value");
        assert!(s.arena_pointer() <= head_value.addr());
    }
    // Every host-held wrapper is still alive.
    for &id in held {
        assert!(s.refs(id).is_some());
    }
}

proptest! {
    #[test]
    fn random_lifecycles_end_clean(ops in proptest::collection::vec(arb_op(), 1..40)) {
        let mut s = ValueStack::new(
            MockEngine::new(4096),
            StackConfig { auto_promote: false },
        );
        let mut held: Vec<WrapperId> = Vec::new();

        for op in ops {
            match op {
                Op::Push(words) => {
                    let v = s.engine_mut().eval(&vec![1; words]);
                    let id = s.produce_wrapper(v).unwrap().unwrap();
                    held.push(id);
                }
                Op::Release(seed) => {
                    if !held.is_empty() {
                        let id = held.swap_remove(seed % held.len());
                        s.release(id).unwrap();
                    }
                }
                Op::Promote => {
                    s.promote_to_heap(None).unwrap();
                    prop_assert_eq!(s.tracked_len(), 0);
                }
            }
            check_invariants(&s, &held);
        }

        // Whatever happened, dropping the remaining host references
        // drains the tracker and returns the pointer to the top.
        for id in held.drain(..) {
            s.release(id).unwrap();
        }
        prop_assert_eq!(s.tracked_len(), 0);
        prop_assert_eq!(s.arena_pointer(), s.arena_top());
    }

    #[test]
    fn auto_promotion_bounds_occupancy(words in proptest::collection::vec(4usize..32, 1..24)) {
        let mut s = ValueStack::new(MockEngine::new(2048), StackConfig::default());
        let mut held = Vec::new();
        for n in words {
            let v = s.engine_mut().eval(&vec![1; n]);
            held.push(s.produce_wrapper(v).unwrap().unwrap());
            // A push may overshoot the threshold by at most its own
            // size before bulk promotion empties the arena.
            prop_assert!(s.arena_used() * 2 <= s.arena_size() + n * 2 * WORD_BYTES);
        }
        for id in held {
            s.release(id).unwrap();
        }
        prop_assert_eq!(s.arena_pointer(), s.arena_top());
    }
}
