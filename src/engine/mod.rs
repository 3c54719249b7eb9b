// src/engine/mod.rs

//! Public engine façade.
//!
//! The engine orders work by the variables it declares. For each variable:
//! - reads submitted back to back may run concurrently,
//! - a write runs alone, after every access submitted before it,
//! - nothing overtakes an earlier submission.
//!
//! Work on disjoint variables is never ordered. Pushing never blocks;
//! [`Engine::wait_for_var`] and [`Engine::wait_for_all`] are the only
//! blocking calls.
//!
//! # The completion contract
//!
//! Asynchronous work receives a [`Completion`] and **must** signal it exactly
//! once. Until it does, every later access to the work's variables and every
//! wait covering them is blocked. The engine has no timeout or watchdog: a
//! work function that holds on to its completion forever is
//! indistinguishable from a deadlock.

pub(crate) mod core;
pub mod shared;
pub(crate) mod wait;

use std::fmt;
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::deps::operator::Operator;
use crate::deps::request::{RequestKind, Retire, Work};
use crate::deps::resolver::collect_accesses;
use crate::deps::var::Access;
use crate::deps::{OprHandle, VarHandle, VarStats};
use crate::errors::{EngineError, Result};
use crate::exec::{Completion, Executor, InlineExecutor, ThreadedExecutor, in_worker};
use crate::types::{Context, EngineKind, Property, RunContext};

use self::core::EngineCore;
use self::wait::Latch;

/// Dependency-tracking execution engine.
pub struct Engine {
    core: Arc<EngineCore>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine").field("core", &self.core).finish()
    }
}

impl Engine {
    /// Build an engine with the executor selected by `config`.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let executor: Arc<dyn Executor> = match config.kind() {
            EngineKind::Threaded => Arc::new(ThreadedExecutor::new(config.workers)?),
            EngineKind::Naive => Arc::new(InlineExecutor::new()),
        };
        debug!(kind = ?config.kind(), "engine created");
        Ok(Self::with_executor(executor))
    }

    /// Engine that runs all work inline on the thread that makes it ready.
    pub fn naive() -> Self {
        Self::with_executor(Arc::new(InlineExecutor::new()))
    }

    /// Engine driving a caller-supplied executor.
    pub fn with_executor(executor: Arc<dyn Executor>) -> Self {
        Self {
            core: Arc::new(EngineCore::new(executor)),
        }
    }

    /// Allocate a new variable with an empty queue.
    pub fn new_variable(&self) -> Result<VarHandle> {
        let (key, _) = self
            .core
            .vars()
            .insert_with(|key| crate::deps::var::Var::new(VarHandle::from_key(key)))?;
        Ok(VarHandle::from_key(key))
    }

    /// Store a reusable operator.
    ///
    /// `reads` and `writes` are resolved now and reused by every
    /// [`push`](Self::push). A variable listed in both is taken as a write.
    pub fn new_operator<F>(
        &self,
        func: F,
        reads: &[VarHandle],
        writes: &[VarHandle],
        prop: Property,
    ) -> Result<OprHandle>
    where
        F: Fn(RunContext, Completion) + Send + Sync + 'static,
    {
        let accesses = collect_accesses(
            self.core.lookup_vars(reads)?,
            self.core.lookup_vars(writes)?,
        );
        let (key, _) = self.core.oprs().insert_with(|key| {
            Operator::new(OprHandle::from_key(key), Arc::new(func), accesses, prop)
        })?;
        let handle = OprHandle::from_key(key);
        debug!(opr = %handle, ?prop, "operator created");
        Ok(handle)
    }

    /// Schedule deletion of an operator.
    ///
    /// Storage is reclaimed only after every invocation pushed before this
    /// call has completed. Pushing the operator afterwards fails with
    /// [`EngineError::OperatorDeleted`].
    pub fn delete_operator(&self, op: OprHandle) -> Result<()> {
        let operator = self.core.lookup_opr(op)?;
        if !operator.begin_delete() {
            return Err(EngineError::OperatorDeleted(op.to_string()));
        }

        self.core.submit(
            RequestKind::DeleteOperator,
            Context::cpu(),
            Property::Normal,
            operator.exclusive_accesses(),
            Work::Inline(Box::new(|| {})),
            Retire::Operator(operator.handle()),
        )
    }

    /// Invoke a stored operator on `ctx`.
    pub fn push(&self, op: OprHandle, ctx: Context) -> Result<()> {
        let operator = self.core.lookup_opr(op)?;
        if operator.is_deleting() {
            return Err(EngineError::OperatorDeleted(op.to_string()));
        }

        let func = operator.func();
        self.core.submit(
            RequestKind::Operator,
            ctx,
            operator.prop(),
            operator.accesses(),
            Work::Run(Box::new(move |run_ctx, done| func(run_ctx, done))),
            Retire::Nothing,
        )
    }

    /// Push asynchronous work. Returns immediately; `func` runs once every
    /// earlier conflicting access has completed, and must signal the
    /// [`Completion`] it receives.
    pub fn push_async<F>(
        &self,
        func: F,
        ctx: Context,
        reads: &[VarHandle],
        writes: &[VarHandle],
        prop: Property,
    ) -> Result<()>
    where
        F: FnOnce(RunContext, Completion) + Send + 'static,
    {
        let accesses = collect_accesses(
            self.core.lookup_vars(reads)?,
            self.core.lookup_vars(writes)?,
        );
        self.core.submit(
            RequestKind::Push,
            ctx,
            prop,
            accesses,
            Work::Run(Box::new(func)),
            Retire::Nothing,
        )
    }

    /// Push synchronous work: it completes as soon as `func` returns.
    pub fn push_sync<F>(
        &self,
        func: F,
        ctx: Context,
        reads: &[VarHandle],
        writes: &[VarHandle],
        prop: Property,
    ) -> Result<()>
    where
        F: FnOnce(RunContext) + Send + 'static,
    {
        self.push_async(
            move |run_ctx, done| {
                func(run_ctx);
                done.signal();
            },
            ctx,
            reads,
            writes,
            prop,
        )
    }

    /// Schedule deletion of `var`.
    ///
    /// Waits behind everything already queued on `var`, then runs
    /// `on_deleted` on `ctx` and releases the variable. From this call on,
    /// new work touching `var` is rejected.
    pub fn delete_variable<F>(&self, on_deleted: F, ctx: Context, var: VarHandle) -> Result<()>
    where
        F: FnOnce(RunContext) + Send + 'static,
    {
        let target = self.core.lookup_var(var)?;
        self.core.submit(
            RequestKind::DeleteVariable,
            ctx,
            Property::Normal,
            vec![(target, Access::Write)],
            Work::Run(Box::new(move |run_ctx, done: Completion| {
                on_deleted(run_ctx);
                done.signal();
            })),
            Retire::Variable(var),
        )
    }

    fn push_barrier(&self, var: VarHandle, action: Box<dyn FnOnce() + Send>) -> Result<()> {
        let target = self.core.lookup_var(var)?;
        self.core.submit(
            RequestKind::Barrier,
            Context::cpu(),
            Property::Async,
            vec![(target, Access::Write)],
            Work::Inline(action),
            Retire::Nothing,
        )
    }

    /// Block until everything queued on `var` before this call has
    /// completed.
    ///
    /// Work pushed on `var` afterwards is not waited for. Fails with
    /// [`EngineError::WaitFromWorker`] when called from inside a work
    /// function.
    pub fn wait_for_var(&self, var: VarHandle) -> Result<()> {
        if in_worker() {
            return Err(EngineError::WaitFromWorker);
        }

        let latch = Arc::new(Latch::new());
        let opener = Arc::clone(&latch);
        self.push_barrier(var, Box::new(move || opener.open()))?;
        latch.wait();
        Ok(())
    }

    /// Async flavour of [`wait_for_var`](Self::wait_for_var).
    pub async fn wait_for_var_async(&self, var: VarHandle) -> Result<()> {
        let (tx, rx) = oneshot::channel::<()>();
        self.push_barrier(
            var,
            Box::new(move || {
                let _ = tx.send(());
            }),
        )?;
        rx.await.map_err(|e| EngineError::Other(e.into()))
    }

    /// Block until no request is pending or running anywhere in the engine.
    ///
    /// This waits for the global count of outstanding requests to reach
    /// zero, not for a snapshot of the work pushed before the call. Other
    /// threads pushing steadily can keep it from returning indefinitely, as
    /// can a held, never-signalled [`Completion`].
    pub fn wait_for_all(&self) -> Result<()> {
        if in_worker() {
            return Err(EngineError::WaitFromWorker);
        }
        self.core.wait_idle();
        Ok(())
    }

    /// Snapshot of a variable's queue.
    pub fn var_stats(&self, var: VarHandle) -> Result<VarStats> {
        Ok(self.core.lookup_var(var)?.stats())
    }

    /// Requests submitted and not yet completed.
    pub fn pending(&self) -> usize {
        self.core.outstanding()
    }

    pub fn live_variables(&self) -> usize {
        self.core.vars().len()
    }

    pub fn live_operators(&self) -> usize {
        self.core.oprs().len()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if in_worker() {
            warn!(
                pending = self.core.outstanding(),
                "engine dropped from inside a work function; not draining"
            );
        } else {
            self.core.wait_idle();
        }
        self.core.shutdown();
    }
}
