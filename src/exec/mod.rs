// src/exec/mod.rs

//! Execution layer.
//!
//! - [`backend`] defines the [`Executor`] trait and the [`Job`] handed to it.
//! - [`completion`] is the one-shot token work functions signal when done.
//! - [`inline`] runs jobs on the calling thread (naive engine, tests).
//! - [`threaded`] runs jobs on per-context lanes backed by Tokio.

pub mod backend;
pub mod completion;
pub mod inline;
pub mod threaded;

use std::sync::Arc;

pub use backend::{Executor, Job, in_worker};
pub use completion::Completion;
pub use inline::InlineExecutor;
pub use threaded::ThreadedExecutor;

use crate::types::RunContext;

/// Asynchronous work: must eventually signal the [`Completion`] it is given.
pub type AsyncFn = Box<dyn FnOnce(RunContext, Completion) + Send + 'static>;

/// Work stored in an operator and invoked once per push.
pub type OperatorFn = Arc<dyn Fn(RunContext, Completion) + Send + Sync + 'static>;
