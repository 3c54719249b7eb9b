// src/deps/var.rs

//! Per-variable access queue.
//!
//! Each variable tracks which accesses are currently granted (any number of
//! reads, or a single write) and a FIFO of requests still waiting for their
//! turn. A request that is granted on a variable keeps its slot until it
//! completes, even if it is still waiting on other variables.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::trace;

use crate::deps::request::Request;
use crate::deps::VarHandle;

/// How a request touches a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

#[derive(Debug)]
struct Waiting {
    request: Arc<Request>,
    access: Access,
}

/// Snapshot of a variable's bookkeeping, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VarStats {
    /// Requests waiting for their turn.
    pub queued: usize,
    /// Granted reads that have not completed.
    pub active_reads: usize,
    /// Whether a granted write has not completed.
    pub active_write: bool,
    pub pending_delete: bool,
}

impl VarStats {
    pub fn is_idle(&self) -> bool {
        self.queued == 0 && self.active_reads == 0 && !self.active_write
    }
}

#[derive(Debug, Default)]
pub(crate) struct VarState {
    queue: VecDeque<Waiting>,
    active_reads: usize,
    active_write: bool,
    pending_delete: bool,
}

impl VarState {
    fn can_start(&self, access: Access) -> bool {
        match access {
            Access::Read => !self.active_write,
            Access::Write => !self.active_write && self.active_reads == 0,
        }
    }

    fn start(&mut self, access: Access) {
        match access {
            Access::Read => self.active_reads += 1,
            Access::Write => self.active_write = true,
        }
    }

    /// Register `request` at the tail. Returns `true` if it was granted
    /// immediately.
    ///
    /// Nothing may overtake the queue: a read arriving behind a waiting write
    /// waits too, even though no write is active yet.
    pub(crate) fn append(&mut self, request: &Arc<Request>, access: Access) -> bool {
        if self.queue.is_empty() && self.can_start(access) {
            self.start(access);
            return true;
        }
        self.queue.push_back(Waiting {
            request: Arc::clone(request),
            access,
        });
        false
    }

    /// Retire a completed access and grant whatever the new head allows: a
    /// single write, or the whole run of reads up to the next write.
    pub(crate) fn release(&mut self, access: Access, granted: &mut Vec<Arc<Request>>) {
        match access {
            Access::Read => {
                assert!(self.active_reads > 0, "read released with no active reads");
                self.active_reads -= 1;
            }
            Access::Write => {
                assert!(self.active_write, "write released with no active write");
                self.active_write = false;
            }
        }

        while let Some(head) = self.queue.front() {
            if !self.can_start(head.access) {
                break;
            }
            let Some(next) = self.queue.pop_front() else {
                break;
            };
            self.start(next.access);
            granted.push(next.request);
        }
    }

    pub(crate) fn pending_delete(&self) -> bool {
        self.pending_delete
    }

    pub(crate) fn mark_pending_delete(&mut self) {
        self.pending_delete = true;
    }

    pub(crate) fn stats(&self) -> VarStats {
        VarStats {
            queued: self.queue.len(),
            active_reads: self.active_reads,
            active_write: self.active_write,
            pending_delete: self.pending_delete,
        }
    }
}

/// Engine-side state of one variable.
#[derive(Debug)]
pub(crate) struct Var {
    handle: VarHandle,
    state: Mutex<VarState>,
}

impl Var {
    pub(crate) fn new(handle: VarHandle) -> Self {
        trace!(var = %handle, "variable allocated");
        Self {
            handle,
            state: Mutex::new(VarState::default()),
        }
    }

    pub(crate) fn handle(&self) -> VarHandle {
        self.handle
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, VarState> {
        self.state.lock()
    }

    pub(crate) fn stats(&self) -> VarStats {
        self.state.lock().stats()
    }
}
