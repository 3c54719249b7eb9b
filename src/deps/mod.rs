// src/deps/mod.rs

//! Dependency tracking.
//!
//! - [`arena`] hands out generational handles for variables and operators.
//! - [`var`] holds the per-variable read/write queue.
//! - [`request`] is the one-shot scheduling unit.
//! - [`resolver`] registers requests and propagates completions.
//! - [`operator`] stores reusable work descriptions.

pub mod arena;
pub(crate) mod operator;
pub(crate) mod request;
pub(crate) mod resolver;
pub mod var;

use std::fmt;

use arena::Key;

pub use var::{Access, VarStats};

/// Handle to a variable. Cheap to copy; stale once the variable is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarHandle(Key);

impl VarHandle {
    pub(crate) fn from_key(key: Key) -> Self {
        Self(key)
    }

    pub fn key(&self) -> Key {
        self.0
    }
}

impl fmt::Display for VarHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "var#{}", self.0)
    }
}

/// Handle to a stored operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OprHandle(Key);

impl OprHandle {
    pub(crate) fn from_key(key: Key) -> Self {
        Self(key)
    }

    pub fn key(&self) -> Key {
        self.0
    }
}

impl fmt::Display for OprHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "opr#{}", self.0)
    }
}
