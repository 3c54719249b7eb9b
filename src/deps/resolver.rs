// src/deps/resolver.rs

//! Dependency resolution: registration of new requests and propagation of
//! completions across the variables they touch.
//!
//! Both operations lock the request's whole variable set in ascending key
//! order and hold it until every variable has been updated. Two requests
//! sharing several variables are therefore ordered identically on all of
//! them, and a completion is never observed half-applied. Nothing here
//! dispatches work; callers get the list of requests that became ready and
//! dispatch after every lock is released.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::MutexGuard;
use tracing::trace;

use crate::deps::arena::Key;
use crate::deps::request::{Request, RequestKind, Retire};
use crate::deps::var::{Access, Var, VarState};
use crate::errors::{EngineError, Result};

/// Merge read and write sets into one sorted access list.
///
/// Duplicates collapse, and a variable present in both sets is a write.
pub(crate) fn collect_accesses(
    reads: Vec<Arc<Var>>,
    writes: Vec<Arc<Var>>,
) -> Vec<(Arc<Var>, Access)> {
    let mut merged: BTreeMap<Key, (Arc<Var>, Access)> = BTreeMap::new();

    for var in reads {
        merged
            .entry(var.handle().key())
            .or_insert_with(|| (var, Access::Read));
    }
    for var in writes {
        merged.insert(var.handle().key(), (var, Access::Write));
    }

    merged.into_values().collect()
}

fn lock_all(request: &Request) -> Vec<MutexGuard<'_, VarState>> {
    request.accesses().iter().map(|(var, _)| var.lock()).collect()
}

/// Enqueue `request` on every variable it touches.
///
/// Returns `Ok(true)` if the request is ready to dispatch right away. If any
/// variable is already pending deletion, nothing is enqueued anywhere.
pub(crate) fn register(request: &Arc<Request>) -> Result<bool> {
    let mut guards = lock_all(request);

    // Operator teardown may still queue behind a variable's deletion: it only
    // needs the operator's earlier invocations to drain.
    if request.kind() != RequestKind::DeleteOperator {
        for (guard, (var, _)) in guards.iter().zip(request.accesses()) {
            if guard.pending_delete() {
                return Err(EngineError::VariableDeleted(var.handle().to_string()));
            }
        }
    }

    let deleting = match request.retire() {
        Retire::Variable(handle) => Some(handle),
        _ => None,
    };

    let mut granted = 0;
    for (guard, (var, access)) in guards.iter_mut().zip(request.accesses()) {
        if guard.append(request, *access) {
            granted += 1;
        }
        if deleting == Some(var.handle()) {
            guard.mark_pending_delete();
        }
        trace!(
            request = request.id(),
            var = %var.handle(),
            ?access,
            queued = guard.stats().queued,
            "registered access"
        );
    }

    drop(guards);

    // The extra unit is the registering thread's hold; dropping it last means
    // a concurrent completion can never dispatch a half-registered request.
    Ok(request.resolve(granted + 1))
}

/// Retire `request`'s accesses and return the requests that became ready.
pub(crate) fn propagate(request: &Request) -> Vec<Arc<Request>> {
    let mut guards = lock_all(request);
    let mut granted = Vec::new();

    for (guard, (var, access)) in guards.iter_mut().zip(request.accesses()) {
        let before = granted.len();
        guard.release(*access, &mut granted);
        trace!(
            request = request.id(),
            var = %var.handle(),
            ?access,
            newly_granted = granted.len() - before,
            "released access"
        );
    }

    drop(guards);

    granted.into_iter().filter(|next| next.resolve(1)).collect()
}
