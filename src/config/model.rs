// src/config/model.rs

use serde::Deserialize;

use crate::types::EngineKind;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [engine]
/// kind = "threaded"
///
/// [workers]
/// compute = 4
/// copy = 1
/// runtime_threads = 2
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawEngineConfig {
    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub workers: WorkersSection,
}

/// `[engine]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    /// `"threaded"` (default) or `"naive"`.
    #[serde(default)]
    pub kind: EngineKind,
}

/// `[workers]` section: concurrency of the threaded executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkersSection {
    /// Jobs that may run at once on one context's compute lane.
    #[serde(default = "default_compute")]
    pub compute: usize,

    /// Jobs that may run at once on one device's copy lane.
    #[serde(default = "default_copy")]
    pub copy: usize,

    /// Tokio worker threads driving the lane loops. Jobs themselves run on
    /// the blocking pool.
    #[serde(default = "default_runtime_threads")]
    pub runtime_threads: usize,
}

fn default_compute() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_copy() -> usize {
    1
}

fn default_runtime_threads() -> usize {
    2
}

impl Default for WorkersSection {
    fn default() -> Self {
        Self {
            compute: default_compute(),
            copy: default_copy(),
            runtime_threads: default_runtime_threads(),
        }
    }
}

/// Validated engine configuration.
///
/// Only obtainable through `TryFrom<RawEngineConfig>` (see `validate.rs`)
/// or [`EngineConfig::default`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub engine: EngineSection,
    pub workers: WorkersSection,
}

impl EngineConfig {
    pub(crate) fn new_unchecked(engine: EngineSection, workers: WorkersSection) -> Self {
        Self { engine, workers }
    }

    pub fn kind(&self) -> EngineKind {
        self.engine.kind
    }

    /// Shorthand for a validated config with the given kind and default
    /// workers.
    pub fn with_kind(kind: EngineKind) -> Self {
        Self::new_unchecked(EngineSection { kind }, WorkersSection::default())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new_unchecked(EngineSection::default(), WorkersSection::default())
    }
}
