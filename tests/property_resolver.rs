// tests/property_resolver.rs

mod common;
use crate::common::{AccessProbe, manual_engine};

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use depengine::{Completion, Context, Property, VarHandle};
use proptest::prelude::*;

const VARS: usize = 4;

/// One pushed unit of work, described at test level.
#[derive(Debug, Clone)]
struct OpPlan {
    reads: Vec<usize>,
    writes: Vec<usize>,
    /// Keep the completion and signal it at a later, random step.
    hold: bool,
}

impl OpPlan {
    /// Effective per-variable access: a variable that is both read and
    /// written counts as written.
    fn effective(&self) -> BTreeMap<usize, bool> {
        let mut access = BTreeMap::new();
        for &r in &self.reads {
            access.entry(r).or_insert(false);
        }
        for &w in &self.writes {
            access.insert(w, true);
        }
        access
    }

    fn conflicts_with(&self, other: &OpPlan) -> bool {
        let mine = self.effective();
        other
            .effective()
            .iter()
            .any(|(var, write)| mine.get(var).is_some_and(|w| *w || *write))
    }
}

// Reads and writes may overlap on purpose; empty access sets are allowed.
fn op_strategy() -> impl Strategy<Value = OpPlan> {
    (
        proptest::collection::vec(0..VARS, 0..3),
        proptest::collection::vec(0..VARS, 0..3),
        any::<bool>(),
    )
        .prop_map(|(reads, writes, hold)| OpPlan {
            reads,
            writes,
            hold,
        })
}

type Held = Arc<Mutex<Vec<(usize, Vec<usize>, Vec<usize>, Completion)>>>;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_workloads_respect_reader_writer_order(
        ops in proptest::collection::vec(op_strategy(), 1..40),
        schedule in proptest::collection::vec(any::<u8>(), 0..400),
    ) {
        let (engine, exec) = manual_engine();
        let vars: Vec<VarHandle> = (0..VARS)
            .map(|_| engine.new_variable().expect("new_variable"))
            .collect();
        let probe = Arc::new(AccessProbe::new());
        let held: Held = Arc::new(Mutex::new(Vec::new()));

        let push = |op: usize| {
            let plan = &ops[op];
            let (reads, writes): (Vec<usize>, Vec<usize>) = {
                let eff = plan.effective();
                (
                    eff.iter().filter(|(_, w)| !**w).map(|(v, _)| *v).collect(),
                    eff.iter().filter(|(_, w)| **w).map(|(v, _)| *v).collect(),
                )
            };
            let read_handles: Vec<_> = plan.reads.iter().map(|&i| vars[i]).collect();
            let write_handles: Vec<_> = plan.writes.iter().map(|&i| vars[i]).collect();
            let probe = Arc::clone(&probe);
            let held = Arc::clone(&held);
            let hold = plan.hold;
            engine
                .push_async(
                    move |_, done| {
                        probe.enter(op, &reads, &writes);
                        if hold {
                            held.lock().unwrap().push((op, reads, writes, done));
                        } else {
                            probe.exit(op, &reads, &writes);
                            done.signal();
                        }
                    },
                    Context::cpu(),
                    &read_handles,
                    &write_handles,
                    Property::Normal,
                )
                .expect("push");
        };

        let signal_one = |pick: usize| -> bool {
            let entry = {
                let mut held = held.lock().unwrap();
                if held.is_empty() {
                    return false;
                }
                let idx = pick % held.len();
                held.swap_remove(idx)
            };
            let (op, reads, writes, done) = entry;
            probe.exit(op, &reads, &writes);
            done.signal();
            true
        };

        // Interleave pushing, running and signalling as the schedule says,
        // then drain whatever is left.
        let mut next_push = 0;
        for &choice in &schedule {
            match choice % 3 {
                0 if next_push < ops.len() => {
                    push(next_push);
                    next_push += 1;
                }
                1 => {
                    exec.run_next();
                }
                _ => {
                    signal_one(choice as usize);
                }
            }
        }
        while next_push < ops.len() {
            push(next_push);
            next_push += 1;
        }
        loop {
            if exec.run_next() {
                continue;
            }
            if !signal_one(0) {
                break;
            }
        }

        let pending = engine.pending();
        if pending != 0 {
            // Dropping would block on the stuck requests.
            std::mem::forget(engine);
            prop_assert_eq!(pending, 0, "requests never completed");
            unreachable!();
        }

        prop_assert_eq!(probe.violations(), Vec::<String>::new());
        for i in 0..ops.len() {
            prop_assert!(probe.finished(i), "op {} never ran", i);
            for j in (i + 1)..ops.len() {
                if ops[i].conflicts_with(&ops[j]) {
                    prop_assert!(
                        probe.ended_before_start(i, j),
                        "op {} must end before conflicting op {} starts", i, j
                    );
                }
            }
        }
        for v in &vars {
            prop_assert!(engine.var_stats(*v).expect("stats").is_idle());
        }
    }
}
