// src/stress.rs

//! Randomized workload used by `depengine stress`.
//!
//! Every operation touches a random subset of variables. While it runs it
//! registers itself on per-variable trackers that flag any overlap the
//! engine should have prevented, and each write performs a deliberately
//! non-atomic increment so that two overlapping writers lose an update.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::deps::VarHandle;
use crate::engine::Engine;
use crate::errors::{EngineError, Result};
use crate::types::{Context, Property};

#[derive(Debug, Clone)]
pub struct StressOptions {
    pub vars: usize,
    pub ops: usize,
    pub fan_in: usize,
    pub write_ratio: f64,
    pub max_work_us: u64,
    pub seed: u64,
}

impl From<&crate::cli::StressArgs> for StressOptions {
    fn from(args: &crate::cli::StressArgs) -> Self {
        Self {
            vars: args.vars,
            ops: args.ops,
            fan_in: args.fan_in,
            write_ratio: args.write_ratio,
            max_work_us: args.max_work_us,
            seed: args.seed,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StressReport {
    pub ops: usize,
    pub reads: usize,
    pub writes: usize,
    /// Overlapping accesses observed at runtime.
    pub violations: usize,
    /// Variables whose final write count disagrees with what was pushed.
    pub lost_updates: usize,
    /// Deletion callbacks that ran.
    pub deleted: usize,
    pub elapsed: Duration,
}

impl StressReport {
    pub fn is_clean(&self) -> bool {
        self.violations == 0 && self.lost_updates == 0
    }
}

#[derive(Debug, Default)]
struct Tracker {
    readers: AtomicUsize,
    writer: AtomicBool,
    value: AtomicU64,
}

#[derive(Debug, Default)]
struct Shared {
    trackers: Vec<Tracker>,
    violations: AtomicUsize,
    deleted: AtomicUsize,
}

impl Shared {
    fn enter(&self, reads: &[usize], writes: &[usize]) {
        for &i in writes {
            let t = &self.trackers[i];
            if t.writer.swap(true, Ordering::SeqCst) || t.readers.load(Ordering::SeqCst) > 0 {
                self.violations.fetch_add(1, Ordering::SeqCst);
            }
        }
        for &i in reads {
            let t = &self.trackers[i];
            t.readers.fetch_add(1, Ordering::SeqCst);
            if t.writer.load(Ordering::SeqCst) {
                self.violations.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn exit(&self, reads: &[usize], writes: &[usize]) {
        for &i in reads {
            self.trackers[i].readers.fetch_sub(1, Ordering::SeqCst);
        }
        for &i in writes {
            self.trackers[i].writer.store(false, Ordering::SeqCst);
        }
    }

    fn bump(&self, writes: &[usize]) {
        for &i in writes {
            let value = &self.trackers[i].value;
            let seen = value.load(Ordering::Relaxed);
            std::hint::spin_loop();
            value.store(seen + 1, Ordering::Relaxed);
        }
    }
}

/// Pick up to `fan_in` distinct variables and split them into reads/writes.
fn pick(rng: &mut StdRng, opts: &StressOptions) -> (Vec<usize>, Vec<usize>) {
    let count = rng.gen_range(1..=opts.fan_in.clamp(1, opts.vars));
    let chosen = rand::seq::index::sample(rng, opts.vars, count);

    let (mut reads, mut writes) = (Vec::new(), Vec::new());
    for i in chosen.iter() {
        if rng.gen_bool(opts.write_ratio) {
            writes.push(i);
        } else {
            reads.push(i);
        }
    }
    (reads, writes)
}

impl StressOptions {
    fn validate(&self) -> Result<()> {
        if self.vars == 0 {
            return Err(EngineError::ConfigError(
                "stress: vars must be >= 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.write_ratio) {
            return Err(EngineError::ConfigError(format!(
                "stress: write_ratio must be within [0, 1] (got {})",
                self.write_ratio
            )));
        }
        Ok(())
    }
}

/// Run the workload on `engine`, drain it, then delete every variable.
pub fn run_stress(engine: &Engine, opts: &StressOptions) -> Result<StressReport> {
    opts.validate()?;
    let started = Instant::now();
    let mut rng = StdRng::seed_from_u64(opts.seed);

    let handles: Vec<VarHandle> = (0..opts.vars)
        .map(|_| engine.new_variable())
        .collect::<Result<_>>()?;
    let shared = Arc::new(Shared {
        trackers: (0..opts.vars).map(|_| Tracker::default()).collect(),
        ..Shared::default()
    });

    let mut expected = vec![0u64; opts.vars];
    let mut report = StressReport {
        ops: opts.ops,
        ..StressReport::default()
    };

    for _ in 0..opts.ops {
        let (reads, writes) = pick(&mut rng, opts);
        for &i in &writes {
            expected[i] += 1;
        }
        report.reads += reads.len();
        report.writes += writes.len();

        let work = Duration::from_micros(rng.gen_range(0..=opts.max_work_us));
        let read_handles: Vec<_> = reads.iter().map(|&i| handles[i]).collect();
        let write_handles: Vec<_> = writes.iter().map(|&i| handles[i]).collect();
        let shared = Arc::clone(&shared);

        engine.push_sync(
            move |_ctx| {
                shared.enter(&reads, &writes);
                std::thread::sleep(work);
                shared.bump(&writes);
                shared.exit(&reads, &writes);
            },
            Context::cpu(),
            &read_handles,
            &write_handles,
            Property::Normal,
        )?;
    }

    engine.wait_for_all()?;

    for (i, tracker) in shared.trackers.iter().enumerate() {
        let got = tracker.value.load(Ordering::SeqCst);
        if got != expected[i] {
            warn!(var = i, expected = expected[i], got, "lost update");
            report.lost_updates += 1;
        }
    }

    for &handle in &handles {
        let shared = Arc::clone(&shared);
        engine.delete_variable(
            move |_ctx| {
                shared.deleted.fetch_add(1, Ordering::SeqCst);
            },
            Context::cpu(),
            handle,
        )?;
    }
    engine.wait_for_all()?;

    report.violations = shared.violations.load(Ordering::SeqCst);
    report.deleted = shared.deleted.load(Ordering::SeqCst);
    report.elapsed = started.elapsed();

    info!(
        ops = report.ops,
        violations = report.violations,
        lost_updates = report.lost_updates,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "stress run finished"
    );

    Ok(report)
}
