// src/lib.rs

//! `depengine`: a dependency-tracking execution engine.
//!
//! Work is pushed together with the variables it reads and the variables it
//! mutates. The engine runs work on disjoint variables concurrently, lets
//! readers of a variable overlap, and runs a writer only after everything
//! submitted earlier on that variable has finished. Callers never lock.
//!
//! ```no_run
//! use depengine::{Context, Engine, Property};
//!
//! # fn main() -> depengine::errors::Result<()> {
//! let engine = Engine::naive();
//! let v = engine.new_variable()?;
//! engine.push_sync(|_| println!("write"), Context::cpu(), &[], &[v], Property::Normal)?;
//! engine.push_sync(|_| println!("read"), Context::cpu(), &[v], &[], Property::Normal)?;
//! engine.wait_for_var(v)?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod deps;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod stress;
pub mod types;

use anyhow::{Result, bail};
use tracing::info;

pub use crate::config::EngineConfig;
pub use crate::deps::{Access, OprHandle, VarHandle, VarStats};
pub use crate::engine::Engine;
pub use crate::errors::EngineError;
pub use crate::exec::{AsyncFn, Completion, Executor, Job, OperatorFn};
pub use crate::types::{Context, DeviceType, EngineKind, Lane, Property, RunContext};

use crate::cli::{CliArgs, Command};
use crate::config::loader::load_and_validate;
use crate::stress::{StressOptions, run_stress};

/// High-level entry point used by `main.rs`.
pub fn run(args: CliArgs) -> Result<()> {
    match args.command {
        Command::CheckConfig { config } => {
            let cfg = load_and_validate(&config)?;
            println!("config {} is valid", config.display());
            println!("  engine.kind = {:?}", cfg.engine.kind);
            println!("  workers.compute = {}", cfg.workers.compute);
            println!("  workers.copy = {}", cfg.workers.copy);
            println!("  workers.runtime_threads = {}", cfg.workers.runtime_threads);
            Ok(())
        }
        Command::Stress(stress) => {
            let cfg = match &stress.config {
                Some(path) => load_and_validate(path)?,
                None => EngineConfig::from_env()?,
            };
            info!(kind = ?cfg.kind(), vars = stress.vars, ops = stress.ops, "starting stress run");
            let engine = Engine::new(cfg)?;
            let report = run_stress(&engine, &StressOptions::from(&stress))?;

            println!(
                "ops={} reads={} writes={} violations={} lost_updates={} deleted={} elapsed_ms={}",
                report.ops,
                report.reads,
                report.writes,
                report.violations,
                report.lost_updates,
                report.deleted,
                report.elapsed.as_millis()
            );

            if !report.is_clean() {
                bail!("ordering violations detected");
            }
            Ok(())
        }
    }
}
