#![allow(dead_code)]

use std::error::Error;
use std::sync::Arc;

use depengine::config::WorkersSection;
use depengine::exec::ThreadedExecutor;
use depengine::Engine;

pub use depengine_test_utils::{AccessProbe, ManualExecutor, Phase, eventually, init_tracing};

pub type TestResult = Result<(), Box<dyn Error>>;

/// Engine over a fresh [`ManualExecutor`]; the test drives every job.
pub fn manual_engine() -> (Engine, Arc<ManualExecutor>) {
    init_tracing();
    let executor = Arc::new(ManualExecutor::new());
    let engine = Engine::with_executor(executor.clone());
    (engine, executor)
}

/// Threaded engine with a few workers per lane.
pub fn threaded_engine() -> Engine {
    init_tracing();
    let workers = WorkersSection {
        compute: 4,
        copy: 2,
        runtime_threads: 2,
    };
    let executor = ThreadedExecutor::new(workers).expect("building threaded executor");
    Engine::with_executor(Arc::new(executor))
}
