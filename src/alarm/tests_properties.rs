//! Property-based tests for the alarm scheduler using proptest

use super::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Set(usize, Clock),
    Unset(usize),
}

fn op_strategy(alarms: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..alarms, 0u64..10_000).prop_map(|(i, c)| Op::Set(i, c)),
        (0..alarms).prop_map(Op::Unset),
    ]
}

proptest! {
    /// The cached minimum always equals the true minimum over pending
    /// entries, for any sequence of set/unset calls.
    #[test]
    fn prop_next_pending_is_true_minimum(ops in proptest::collection::vec(op_strategy(6), 1..200)) {
        let mut ctx = AlarmContext::<()>::new("prop");
        let ids: Vec<AlarmId> = (0..6)
            .map(|i| ctx.new_alarm(&format!("a{i}"), Box::new(|_, _, _| {})))
            .collect();
        let mut model: Vec<Option<Clock>> = vec![None; 6];

        for op in ops {
            match op {
                Op::Set(i, c) => {
                    ctx.set(ids[i], c);
                    model[i] = Some(c);
                }
                Op::Unset(i) => {
                    ctx.unset(ids[i]);
                    model[i] = None;
                }
            }
            let expected = model.iter().flatten().min().copied().unwrap_or(NEVER);
            prop_assert_eq!(ctx.next_pending_clock(), expected);
        }
    }

    /// Dispatching at the true minimum always fires the lowest-id alarm
    /// among those due, and clears exactly one entry.
    #[test]
    fn prop_dispatch_fires_registration_order(
        clocks in proptest::collection::vec(proptest::option::of(0u64..100), 6),
    ) {
        let mut ctx = AlarmContext::<Vec<usize>>::new("prop");
        let ids: Vec<AlarmId> = (0..6)
            .map(|i| {
                ctx.new_alarm(
                    &format!("a{i}"),
                    Box::new(move |fired_order: &mut Vec<usize>, _, _| fired_order.push(i)),
                )
            })
            .collect();
        let mut model = clocks.clone();
        for (i, clock) in clocks.iter().enumerate() {
            if let Some(c) = clock {
                ctx.set(ids[i], *c);
            }
        }

        let mut fired_order = Vec::new();
        while ctx.next_pending_clock() != NEVER {
            let min = ctx.next_pending_clock();
            ctx.dispatch(&mut fired_order, min);
            // Model: lowest index among entries equal to the minimum
            let expect = model
                .iter()
                .position(|c| *c == Some(min))
                .expect("model out of sync");
            model[expect] = None;
            prop_assert_eq!(*fired_order.last().unwrap(), expect);
        }
        prop_assert!(model.iter().all(|c| c.is_none()));
    }
}
