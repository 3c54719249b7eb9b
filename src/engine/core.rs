// src/engine/core.rs

//! Shared engine state.
//!
//! `EngineCore` owns the handle arenas, the executor and the quiescence
//! counter. It is shared (`Arc`) between the public [`Engine`](super::Engine)
//! and every outstanding [`Completion`], which calls back into
//! [`EngineCore::complete`] to propagate.
//!
//! Requests made ready by a push or a completion go through a thread-local
//! ready queue drained by the outermost call on that thread. Completions
//! signalled while it drains (inline barriers, `Async` jobs) only append to
//! the queue, so a long chain of dependants runs in a loop instead of
//! growing the stack.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::deps::arena::Arena;
use crate::deps::operator::Operator;
use crate::deps::request::{Request, RequestKind, Retire, Work};
use crate::deps::resolver;
use crate::deps::var::{Access, Var};
use crate::deps::{OprHandle, VarHandle};
use crate::errors::{EngineError, Result};
use crate::exec::{Completion, Executor, Job};
use crate::types::{Context, Property};

thread_local! {
    static READY: RefCell<VecDeque<(Arc<EngineCore>, Arc<Request>)>> =
        const { RefCell::new(VecDeque::new()) };
    static DRAINING: Cell<bool> = const { Cell::new(false) };
}

/// Clears the draining flag even if a dispatch unwinds.
struct DrainGuard;

impl Drop for DrainGuard {
    fn drop(&mut self) {
        DRAINING.with(|draining| draining.set(false));
    }
}

pub(crate) struct EngineCore {
    vars: Arena<Var>,
    oprs: Arena<Operator>,
    executor: Arc<dyn Executor>,
    next_request: AtomicU64,
    /// Requests submitted and not yet fully propagated.
    outstanding: AtomicUsize,
    idle_lock: Mutex<()>,
    idle: Condvar,
}

impl EngineCore {
    pub(crate) fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            vars: Arena::new("variable"),
            oprs: Arena::new("operator"),
            executor,
            next_request: AtomicU64::new(1),
            outstanding: AtomicUsize::new(0),
            idle_lock: Mutex::new(()),
            idle: Condvar::new(),
        }
    }

    pub(crate) fn vars(&self) -> &Arena<Var> {
        &self.vars
    }

    pub(crate) fn oprs(&self) -> &Arena<Operator> {
        &self.oprs
    }

    pub(crate) fn lookup_var(&self, handle: VarHandle) -> Result<Arc<Var>> {
        self.vars
            .get(handle.key())
            .ok_or_else(|| EngineError::StaleVariable(handle.to_string()))
    }

    pub(crate) fn lookup_vars(&self, handles: &[VarHandle]) -> Result<Vec<Arc<Var>>> {
        handles.iter().map(|h| self.lookup_var(*h)).collect()
    }

    pub(crate) fn lookup_opr(&self, handle: OprHandle) -> Result<Arc<Operator>> {
        self.oprs
            .get(handle.key())
            .ok_or_else(|| EngineError::StaleOperator(handle.to_string()))
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Create a request, register it, and dispatch it if nothing blocks it.
    pub(crate) fn submit(
        self: &Arc<Self>,
        kind: RequestKind,
        ctx: Context,
        prop: Property,
        accesses: Vec<(Arc<Var>, Access)>,
        work: Work,
        retire: Retire,
    ) -> Result<()> {
        let id = self.next_request.fetch_add(1, Ordering::Relaxed);
        let request = Arc::new(Request::new(id, kind, ctx, prop, accesses, work, retire));

        self.outstanding.fetch_add(1, Ordering::AcqRel);

        match resolver::register(&request) {
            Ok(true) => {
                trace!(request = id, ?kind, %ctx, "request ready at push");
                self.schedule(std::iter::once(request));
                Ok(())
            }
            Ok(false) => {
                trace!(request = id, ?kind, %ctx, "request parked");
                Ok(())
            }
            Err(err) => {
                debug!(request = id, ?kind, error = %err, "request rejected");
                self.finish_one();
                Err(err)
            }
        }
    }

    /// Queue ready requests and, unless this thread is already draining,
    /// dispatch until the queue is empty.
    fn schedule(self: &Arc<Self>, ready: impl IntoIterator<Item = Arc<Request>>) {
        READY.with(|queue| {
            let mut queue = queue.borrow_mut();
            queue.extend(ready.into_iter().map(|request| (Arc::clone(self), request)));
        });

        if DRAINING.with(|draining| draining.replace(true)) {
            return;
        }
        let _guard = DrainGuard;

        while let Some((core, request)) = READY.with(|queue| queue.borrow_mut().pop_front()) {
            core.dispatch(request);
        }
    }

    fn dispatch(self: &Arc<Self>, request: Arc<Request>) {
        let Some(work) = request.take_work() else {
            panic!("request {} dispatched twice", request.id());
        };

        match work {
            Work::Inline(action) => {
                action();
                self.complete(request);
            }
            Work::Run(func) => {
                let core = Arc::clone(self);
                let id = request.id();
                let (ctx, prop) = (request.ctx(), request.prop());
                let job = Job::new(
                    id,
                    ctx,
                    prop,
                    Box::new(move |run_ctx| func(run_ctx, Completion::new(core, request))),
                );
                self.executor.execute(job);
            }
        }
    }

    /// Propagate the completion of `request` and dispatch whatever it
    /// unblocked.
    pub(crate) fn complete(self: &Arc<Self>, request: Arc<Request>) {
        if !request.mark_completed() {
            panic!("completion signalled twice for request {}", request.id());
        }

        let ready = resolver::propagate(&request);

        match request.retire() {
            Retire::Nothing => {}
            Retire::Variable(handle) => {
                self.vars.remove(handle.key());
                debug!(var = %handle, "variable deleted");
            }
            Retire::Operator(handle) => {
                self.oprs.remove(handle.key());
                debug!(opr = %handle, "operator deleted");
            }
        }

        trace!(
            request = request.id(),
            kind = ?request.kind(),
            unblocked = ready.len(),
            "request completed"
        );

        self.schedule(ready);
        self.finish_one();
    }

    fn finish_one(&self) {
        if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            let _guard = self.idle_lock.lock();
            self.idle.notify_all();
        }
    }

    /// Block until no request is outstanding.
    pub(crate) fn wait_idle(&self) {
        let mut guard = self.idle_lock.lock();
        while self.outstanding.load(Ordering::Acquire) != 0 {
            self.idle.wait(&mut guard);
        }
    }

    pub(crate) fn shutdown(&self) {
        self.executor.shutdown();
    }
}

impl fmt::Debug for EngineCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineCore")
            .field("vars", &self.vars)
            .field("oprs", &self.oprs)
            .field("executor", &self.executor)
            .field("outstanding", &self.outstanding())
            .finish_non_exhaustive()
    }
}
