// src/exec/inline.rs

//! Single-threaded executor that runs jobs on the thread that made them
//! ready.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use tracing::trace;

use crate::exec::{Executor, Job};
use crate::types::Lane;

thread_local! {
    static QUEUE: RefCell<VecDeque<Job>> = const { RefCell::new(VecDeque::new()) };
    static DRAINING: Cell<bool> = const { Cell::new(false) };
}

/// Runs every job inline.
///
/// Jobs made ready while another job is running on the same thread (for
/// example by its completion) are queued and run after it returns, in the
/// order they became ready, so long completion chains do not grow the stack.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl InlineExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Executor for InlineExecutor {
    fn execute(&self, job: Job) {
        run_trampolined(job);
    }
}

struct DrainGuard;

impl Drop for DrainGuard {
    fn drop(&mut self) {
        DRAINING.with(|draining| draining.set(false));
    }
}

/// Run `job` on this thread, or queue it behind the job this thread is
/// already running.
///
/// Shared with the threaded executor's inline lane.
pub(crate) fn run_trampolined(job: Job) {
    QUEUE.with(|queue| queue.borrow_mut().push_back(job));

    if DRAINING.with(|draining| draining.replace(true)) {
        return;
    }
    let _guard = DrainGuard;

    while let Some(job) = QUEUE.with(|queue| queue.borrow_mut().pop_front()) {
        trace!(request = job.id(), ctx = %job.ctx(), "running job inline");
        job.run(Lane::Inline);
    }
}
