use std::collections::VecDeque;

use depengine::{Executor, Job, Lane};
use parking_lot::Mutex;
use tracing::trace;

/// A fake executor that:
/// - parks every job it is handed
/// - runs them only when the test says so, one at a time, in FIFO order.
///
/// This is a single lane whose progress is fully visible: a job that the
/// engine never hands over is a job the engine considers blocked.
#[derive(Debug, Default)]
pub struct ManualExecutor {
    parked: Mutex<VecDeque<Job>>,
    ran: Mutex<Vec<u64>>,
}

impl ManualExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs handed over and not yet run.
    pub fn parked(&self) -> usize {
        self.parked.lock().len()
    }

    /// Request ids of the jobs run so far, in order.
    pub fn ran(&self) -> Vec<u64> {
        self.ran.lock().clone()
    }

    /// Run the oldest parked job. Returns `false` if none was parked.
    pub fn run_next(&self) -> bool {
        // Release the lock before running: the job may make more jobs ready.
        let job = self.parked.lock().pop_front();
        match job {
            Some(job) => {
                self.ran.lock().push(job.id());
                job.run(Lane::Compute);
                true
            }
            None => false,
        }
    }

    /// Run parked jobs until none are left, including ones that become
    /// ready along the way. Returns how many ran.
    pub fn run_all(&self) -> usize {
        let mut count = 0;
        while self.run_next() {
            count += 1;
        }
        count
    }
}

impl Executor for ManualExecutor {
    fn execute(&self, job: Job) {
        trace!(request = job.id(), ctx = %job.ctx(), "parking job");
        self.parked.lock().push_back(job);
    }
}
