// src/deps/request.rs

//! One-shot scheduling unit created per push / operator invocation.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::deps::var::{Access, Var};
use crate::deps::{OprHandle, VarHandle};
use crate::exec::AsyncFn;
use crate::types::{Context, Property};

/// What a request does once all its dependencies are resolved.
pub(crate) enum Work {
    /// Handed to the executor; the function signals completion itself.
    Run(AsyncFn),
    /// Engine-internal bookkeeping (barriers, operator teardown). Runs on the
    /// thread that made the request ready and completes immediately.
    Inline(Box<dyn FnOnce() + Send>),
}

/// Storage to release once the request has fully propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Retire {
    Nothing,
    Variable(VarHandle),
    Operator(OprHandle),
}

/// Short tag used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestKind {
    Push,
    Operator,
    DeleteVariable,
    DeleteOperator,
    Barrier,
}

pub(crate) struct Request {
    id: u64,
    kind: RequestKind,
    ctx: Context,
    prop: Property,
    /// Sorted by variable key, one entry per variable.
    accesses: Vec<(Arc<Var>, Access)>,
    /// Variables not yet granted, plus one held by the registering thread.
    pending: AtomicUsize,
    work: Mutex<Option<Work>>,
    completed: AtomicBool,
    retire: Retire,
}

impl Request {
    pub(crate) fn new(
        id: u64,
        kind: RequestKind,
        ctx: Context,
        prop: Property,
        accesses: Vec<(Arc<Var>, Access)>,
        work: Work,
        retire: Retire,
    ) -> Self {
        let pending = AtomicUsize::new(accesses.len() + 1);
        Self {
            id,
            kind,
            ctx,
            prop,
            accesses,
            pending,
            work: Mutex::new(Some(work)),
            completed: AtomicBool::new(false),
            retire,
        }
    }

    #[cfg(test)]
    pub(crate) fn detached_for_tests() -> Self {
        Self::new(
            0,
            RequestKind::Push,
            Context::cpu(),
            Property::Normal,
            Vec::new(),
            Work::Inline(Box::new(|| {})),
            Retire::Nothing,
        )
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn kind(&self) -> RequestKind {
        self.kind
    }

    pub(crate) fn ctx(&self) -> Context {
        self.ctx
    }

    pub(crate) fn prop(&self) -> Property {
        self.prop
    }

    pub(crate) fn accesses(&self) -> &[(Arc<Var>, Access)] {
        &self.accesses
    }

    pub(crate) fn retire(&self) -> Retire {
        self.retire
    }

    /// Record `n` resolved dependencies. Returns `true` for exactly one
    /// caller: the one that resolved the last of them.
    pub(crate) fn resolve(&self, n: usize) -> bool {
        let before = self.pending.fetch_sub(n, Ordering::AcqRel);
        assert!(before >= n, "request {} resolved more dependencies than it has", self.id);
        before == n
    }

    pub(crate) fn take_work(&self) -> Option<Work> {
        self.work.lock().take()
    }

    /// Mark completion. Returns `false` if the request had already completed.
    pub(crate) fn mark_completed(&self) -> bool {
        !self.completed.swap(true, Ordering::AcqRel)
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("ctx", &self.ctx)
            .field("prop", &self.prop)
            .field("vars", &self.accesses.len())
            .field("pending", &self.pending.load(Ordering::Relaxed))
            .field("retire", &self.retire)
            .finish_non_exhaustive()
    }
}
