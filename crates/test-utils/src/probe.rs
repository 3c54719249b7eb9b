use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub op: usize,
    pub phase: Phase,
}

#[derive(Debug, Default)]
struct ProbeState {
    readers: HashMap<usize, usize>,
    writers: HashSet<usize>,
    violations: Vec<String>,
    log: Vec<Event>,
}

/// Records when test operations start and end, and which (test-level)
/// resources they read or write, flagging any overlap that breaks
/// reader/writer exclusivity.
///
/// All bookkeeping happens under one lock, so the recorded log is a total
/// order of start/end events.
#[derive(Debug, Default)]
pub struct AccessProbe {
    state: Mutex<ProbeState>,
}

impl AccessProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&self, op: usize, reads: &[usize], writes: &[usize]) {
        let mut st = self.state.lock();
        for &w in writes {
            let readers = st.readers.get(&w).copied().unwrap_or(0);
            if !st.writers.insert(w) || readers > 0 {
                st.violations
                    .push(format!("op {op} writes {w} while it is in use"));
            }
        }
        for &r in reads {
            if st.writers.contains(&r) {
                st.violations
                    .push(format!("op {op} reads {r} while it is being written"));
            }
            *st.readers.entry(r).or_insert(0) += 1;
        }
        st.log.push(Event {
            op,
            phase: Phase::Start,
        });
    }

    pub fn exit(&self, op: usize, reads: &[usize], writes: &[usize]) {
        let mut st = self.state.lock();
        for &r in reads {
            if let Some(n) = st.readers.get_mut(&r) {
                *n -= 1;
            }
        }
        for &w in writes {
            st.writers.remove(&w);
        }
        st.log.push(Event {
            op,
            phase: Phase::End,
        });
    }

    pub fn violations(&self) -> Vec<String> {
        self.state.lock().violations.clone()
    }

    pub fn log(&self) -> Vec<Event> {
        self.state.lock().log.clone()
    }

    /// Index of `op`'s event of the given phase in the log.
    pub fn position(&self, op: usize, phase: Phase) -> Option<usize> {
        self.state
            .lock()
            .log
            .iter()
            .position(|e| e.op == op && e.phase == phase)
    }

    pub fn started(&self, op: usize) -> bool {
        self.position(op, Phase::Start).is_some()
    }

    pub fn finished(&self, op: usize) -> bool {
        self.position(op, Phase::End).is_some()
    }

    /// Whether `a` ended before `b` started.
    pub fn ended_before_start(&self, a: usize, b: usize) -> bool {
        match (self.position(a, Phase::End), self.position(b, Phase::Start)) {
            (Some(end), Some(start)) => end < start,
            _ => false,
        }
    }

    /// Whether `a` and `b` were running at the same time at some point.
    pub fn overlapped(&self, a: usize, b: usize) -> bool {
        let positions = (
            self.position(a, Phase::Start),
            self.position(a, Phase::End),
            self.position(b, Phase::Start),
            self.position(b, Phase::End),
        );
        match positions {
            (Some(sa), Some(ea), Some(sb), Some(eb)) => sa < eb && sb < ea,
            _ => false,
        }
    }
}
