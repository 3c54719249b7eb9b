// src/exec/completion.rs

//! Completion channel between work functions and the engine.

use std::fmt;
use std::sync::Arc;

use tracing::{error, warn};

use crate::deps::request::Request;
use crate::engine::core::EngineCore;

/// One-shot token an asynchronous work function uses to report that it is
/// done.
///
/// It can be moved to any thread and must be signalled exactly once;
/// [`signal`](Self::signal) consumes it. Dependants of the request stay
/// blocked until that happens: a token that is held and never signalled
/// stalls every later access to the request's variables, and every
/// `wait_for_var`/`wait_for_all` that covers them, forever. The engine has
/// no timeout.
///
/// Dropping the token without signalling counts as a failed completion: the
/// drop is logged and the dependency queues still advance.
pub struct Completion {
    core: Arc<EngineCore>,
    request: Option<Arc<Request>>,
}

impl Completion {
    pub(crate) fn new(core: Arc<EngineCore>, request: Arc<Request>) -> Self {
        Self {
            core,
            request: Some(request),
        }
    }

    /// Report successful completion.
    pub fn signal(mut self) {
        if let Some(request) = self.request.take() {
            self.core.complete(request);
        }
    }

    /// Report that the work failed. Ordering is unaffected: dependants run
    /// exactly as after [`signal`](Self::signal). The engine only logs the
    /// reason; surfacing it is up to the caller.
    pub fn fail(mut self, reason: impl fmt::Display) {
        if let Some(request) = self.request.take() {
            warn!(request = request.id(), %reason, "work function reported failure");
            self.core.complete(request);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        let Some(request) = self.request.take() else {
            return;
        };

        if std::thread::panicking() {
            warn!(
                request = request.id(),
                "work function unwound before signalling; completing as failed"
            );
        } else {
            error!(
                request = request.id(),
                "completion dropped without being signalled; completing as failed"
            );
        }
        self.core.complete(request);
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("request", &self.request.as_ref().map(|r| r.id()))
            .finish_non_exhaustive()
    }
}
