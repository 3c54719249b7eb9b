// src/exec/backend.rs

//! Pluggable executor abstraction.
//!
//! The engine decides *when* a request may run; an [`Executor`] decides
//! *where*. The engine hands over a [`Job`] once every dependency is
//! resolved and never looks at it again; completion comes back through the
//! job's [`Completion`](super::Completion).
//!
//! - [`InlineExecutor`](super::InlineExecutor) runs jobs on the calling thread.
//! - [`ThreadedExecutor`](super::ThreadedExecutor) runs them on per-context
//!   lanes.
//! - Tests can supply their own implementation that parks jobs until told
//!   to run them.

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use tracing::error;

use crate::types::{Context, Lane, Property, RunContext};

/// Trait abstracting how ready work is executed.
pub trait Executor: Send + Sync + fmt::Debug {
    /// Run `job` now or later, on any thread. Must not block on other jobs.
    fn execute(&self, job: Job);

    /// Stop accepting work. Called once the engine is quiescent and being
    /// torn down.
    fn shutdown(&self) {}
}

thread_local! {
    static IN_WORKER: Cell<bool> = const { Cell::new(false) };
}

/// Whether the current thread is inside a work function run by the engine.
pub fn in_worker() -> bool {
    IN_WORKER.with(Cell::get)
}

struct WorkerScope {
    prev: bool,
}

impl WorkerScope {
    fn enter() -> Self {
        Self {
            prev: IN_WORKER.with(|flag| flag.replace(true)),
        }
    }
}

impl Drop for WorkerScope {
    fn drop(&mut self) {
        IN_WORKER.with(|flag| flag.set(self.prev));
    }
}

/// A request whose dependencies are all resolved.
pub struct Job {
    id: u64,
    ctx: Context,
    prop: Property,
    body: Box<dyn FnOnce(RunContext) + Send>,
}

impl Job {
    pub(crate) fn new(
        id: u64,
        ctx: Context,
        prop: Property,
        body: Box<dyn FnOnce(RunContext) + Send>,
    ) -> Self {
        Self {
            id,
            ctx,
            prop,
            body,
        }
    }

    /// Engine-assigned request id (for logs).
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn ctx(&self) -> Context {
        self.ctx
    }

    pub fn prop(&self) -> Property {
        self.prop
    }

    /// Run the job on the current thread, placed on `lane`.
    ///
    /// A panic in the work function is caught and logged here; the job's
    /// completion token propagates as a failure while unwinding, so
    /// dependants are still released.
    pub fn run(self, lane: Lane) {
        let run_ctx = RunContext { ctx: self.ctx, lane };
        let id = self.id;
        let body = self.body;

        let _scope = WorkerScope::enter();
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || body(run_ctx))) {
            error!(
                request = id,
                ctx = %run_ctx.ctx,
                ?lane,
                panic = %panic_message(payload.as_ref()),
                "work function panicked"
            );
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("ctx", &self.ctx)
            .field("prop", &self.prop)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}
