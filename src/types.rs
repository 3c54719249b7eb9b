use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Hint describing what kind of work is being pushed.
///
/// The resolver never looks at this; it is forwarded to the executor so it
/// can pick a lane (compute vs. copy, or inline for `Async`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Property {
    #[default]
    Normal,
    /// Copy from host memory to a device.
    CopyToDevice,
    /// Copy from a device back to host memory.
    CopyFromDevice,
    /// The function only kicks off asynchronous work and returns quickly.
    Async,
}

/// Kind of device an execution context targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceType {
    Cpu,
    CpuPinned,
    Gpu,
}

/// Target device/stream for a request. Routing only; never affects ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Context {
    pub device: DeviceType,
    pub id: u32,
}

impl Context {
    pub const fn cpu() -> Self {
        Self {
            device: DeviceType::Cpu,
            id: 0,
        }
    }

    pub const fn cpu_pinned() -> Self {
        Self {
            device: DeviceType::CpuPinned,
            id: 0,
        }
    }

    pub const fn gpu(id: u32) -> Self {
        Self {
            device: DeviceType::Gpu,
            id,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::cpu()
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.device {
            DeviceType::Cpu => write!(f, "cpu({})", self.id),
            DeviceType::CpuPinned => write!(f, "cpu_pinned({})", self.id),
            DeviceType::Gpu => write!(f, "gpu({})", self.id),
        }
    }
}

/// Logical lane a job was placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    Compute,
    Copy,
    /// Ran directly on the thread that made the job ready.
    Inline,
}

impl Lane {
    /// Lane selection used by the threaded executor.
    ///
    /// Copies only get their own lane when a device is involved; on a plain
    /// CPU context they share the compute lane.
    pub fn for_property(prop: Property, ctx: Context) -> Self {
        match prop {
            Property::Async => Lane::Inline,
            Property::CopyToDevice | Property::CopyFromDevice
                if ctx.device != DeviceType::Cpu =>
            {
                Lane::Copy
            }
            _ => Lane::Compute,
        }
    }
}

/// Information handed to a work function when it is run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunContext {
    pub ctx: Context,
    pub lane: Lane,
}

/// Which executor backs the engine.
///
/// - `Threaded`: per-context lanes on a Tokio runtime (default).
/// - `Naive`: everything runs inline on the thread that made it ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Threaded,
    Naive,
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "threaded" | "threadedengine" => Ok(EngineKind::Threaded),
            "naive" | "naiveengine" => Ok(EngineKind::Naive),
            other => Err(format!(
                "invalid engine kind: {other} (expected \"threaded\" or \"naive\")"
            )),
        }
    }
}
