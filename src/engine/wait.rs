// src/engine/wait.rs

//! Blocking wait support.
//!
//! `wait_for_var` is built from the engine's own machinery: it pushes a
//! write-class barrier on the variable whose only action is to open a
//! [`Latch`]. The barrier is granted once every earlier access on the
//! variable has completed, readers included.

use parking_lot::{Condvar, Mutex};

/// One-shot gate a waiting thread blocks on until a barrier opens it.
#[derive(Debug, Default)]
pub(crate) struct Latch {
    open: Mutex<bool>,
    cond: Condvar,
}

impl Latch {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn open(&self) {
        let mut open = self.open.lock();
        *open = true;
        self.cond.notify_all();
    }

    pub(crate) fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.cond.wait(&mut open);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn latch_releases_waiter_opened_from_another_thread() {
        let latch = Arc::new(Latch::new());
        let opener = Arc::clone(&latch);

        let handle = thread::spawn(move || opener.open());
        latch.wait();
        handle.join().unwrap();

        // Already open: returns immediately.
        latch.wait();
    }
}
