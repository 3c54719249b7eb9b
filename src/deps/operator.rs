// src/deps/operator.rs

//! Stored, reusable operators.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::deps::OprHandle;
use crate::deps::var::{Access, Var};
use crate::exec::OperatorFn;
use crate::types::Property;

/// A work function bound to a fixed variable set.
///
/// The access list is resolved once at creation and reused unchanged by
/// every invocation.
pub(crate) struct Operator {
    handle: OprHandle,
    func: OperatorFn,
    accesses: Vec<(Arc<Var>, Access)>,
    prop: Property,
    deleting: AtomicBool,
}

impl Operator {
    pub(crate) fn new(
        handle: OprHandle,
        func: OperatorFn,
        accesses: Vec<(Arc<Var>, Access)>,
        prop: Property,
    ) -> Self {
        Self {
            handle,
            func,
            accesses,
            prop,
            deleting: AtomicBool::new(false),
        }
    }

    pub(crate) fn handle(&self) -> OprHandle {
        self.handle
    }

    pub(crate) fn func(&self) -> OperatorFn {
        Arc::clone(&self.func)
    }

    pub(crate) fn accesses(&self) -> Vec<(Arc<Var>, Access)> {
        self.accesses.clone()
    }

    /// Same variables, all taken exclusively. Used by deferred deletion so it
    /// queues behind every earlier invocation, readers included.
    pub(crate) fn exclusive_accesses(&self) -> Vec<(Arc<Var>, Access)> {
        self.accesses
            .iter()
            .map(|(var, _)| (Arc::clone(var), Access::Write))
            .collect()
    }

    pub(crate) fn prop(&self) -> Property {
        self.prop
    }

    pub(crate) fn is_deleting(&self) -> bool {
        self.deleting.load(Ordering::Acquire)
    }

    /// Returns `false` if a deletion was already requested.
    pub(crate) fn begin_delete(&self) -> bool {
        !self.deleting.swap(true, Ordering::AcqRel)
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("handle", &self.handle)
            .field("vars", &self.accesses.len())
            .field("prop", &self.prop)
            .field("deleting", &self.is_deleting())
            .finish_non_exhaustive()
    }
}
