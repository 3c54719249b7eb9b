// src/exec/threaded.rs

//! Multi-lane executor running on a dedicated Tokio runtime.
//!
//! Every `(Context, Lane)` pair gets its own lane: an mpsc channel drained
//! by a Tokio task that hands jobs to the blocking pool. A semaphore bounds
//! how many jobs of one lane run at once. Lanes are created lazily the first
//! time a context is used.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, info, warn};

use crate::config::WorkersSection;
use crate::errors::Result;
use crate::exec::inline::run_trampolined;
use crate::exec::{Executor, Job};
use crate::types::{Context, Lane};

type LaneKey = (Context, Lane);

/// Per-context lane executor.
///
/// `Property::Async` jobs skip the lanes and run on the thread that made
/// them ready; such functions are expected to only kick off work and return.
#[derive(Debug)]
pub struct ThreadedExecutor {
    runtime: Mutex<Option<Runtime>>,
    handle: Handle,
    lanes: DashMap<LaneKey, mpsc::UnboundedSender<Job>>,
    workers: WorkersSection,
    closed: AtomicBool,
}

impl ThreadedExecutor {
    pub fn new(workers: WorkersSection) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(workers.runtime_threads)
            .thread_name("depengine-lane")
            .enable_all()
            .build()?;
        let handle = runtime.handle().clone();

        info!(
            compute = workers.compute,
            copy = workers.copy,
            runtime_threads = workers.runtime_threads,
            "threaded executor started"
        );

        Ok(Self {
            runtime: Mutex::new(Some(runtime)),
            handle,
            lanes: DashMap::new(),
            workers,
            closed: AtomicBool::new(false),
        })
    }

    fn lane_width(&self, lane: Lane) -> usize {
        match lane {
            Lane::Copy => self.workers.copy,
            Lane::Compute | Lane::Inline => self.workers.compute,
        }
    }

    fn lane_sender(&self, key: LaneKey) -> mpsc::UnboundedSender<Job> {
        self.lanes
            .entry(key)
            .or_insert_with(|| spawn_lane(&self.handle, key, self.lane_width(key.1)))
            .clone()
    }
}

/// Spawn the loop draining one lane.
fn spawn_lane(handle: &Handle, key: LaneKey, width: usize) -> mpsc::UnboundedSender<Job> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
    let (ctx, lane) = key;

    handle.spawn(async move {
        debug!(%ctx, ?lane, width, "lane started");
        let permits = Arc::new(Semaphore::new(width));

        while let Some(job) = rx.recv().await {
            // FIFO permits keep jobs of one lane starting in arrival order.
            let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                break;
            };
            tokio::task::spawn_blocking(move || {
                job.run(lane);
                drop(permit);
            });
        }

        debug!(%ctx, ?lane, "lane finished (channel closed)");
    });

    tx
}

impl Executor for ThreadedExecutor {
    fn execute(&self, job: Job) {
        let lane = Lane::for_property(job.prop(), job.ctx());
        if lane == Lane::Inline {
            run_trampolined(job);
            return;
        }
        if self.closed.load(Ordering::Acquire) {
            warn!(request = job.id(), "executor shut down; running job inline");
            run_trampolined(job);
            return;
        }

        let key = (job.ctx(), lane);
        if let Err(mpsc::error::SendError(job)) = self.lane_sender(key).send(job) {
            warn!(
                request = job.id(),
                ctx = %key.0,
                ?lane,
                "lane closed; running job inline"
            );
            run_trampolined(job);
        }
    }

    fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        self.lanes.clear();
        if let Some(runtime) = self.runtime.lock().take() {
            runtime.shutdown_background();
            info!("threaded executor shut down");
        }
    }
}

impl Drop for ThreadedExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
