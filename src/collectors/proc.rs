//! Single-pass top-resource-consumer ranking.
//!
//! One walk over the live process table yields the single highest-CPU and
//! highest-memory process, each formatted as a human-readable descriptor.
//! These are instantaneous values, not intervals: a live, non-averaged
//! sample where partial results are acceptable.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use sysinfo::System;

/// One process row as seen by the ranking pass.
#[derive(Debug, Clone)]
pub struct ProcSample {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f32,
    pub mem_percent: f32,
    pub cmdline: String,
}

/// Descriptors for the top consumers. Empty strings when no process had a
/// positive value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TopProcesses {
    pub top_cpu: String,
    pub top_mem: String,
}

impl TopProcesses {
    /// Payload entries contributed alongside the CPU family flush. Both
    /// keys are always present, empty or not.
    pub fn entries(&self) -> BTreeMap<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        }
    }
}

/// Tracks both maxima independently in one pass. A maximum moves only on a
/// strict increase, so the first process to reach a value keeps the slot.
pub fn scan<I>(processes: I) -> TopProcesses
where
    I: IntoIterator<Item = ProcSample>,
{
    let mut max_cpu = 0.0f32;
    let mut max_mem = 0.0f32;
    let mut top = TopProcesses::default();
    for process in processes {
        if process.cpu_percent > max_cpu {
            max_cpu = process.cpu_percent;
            top.top_cpu = describe(&process, process.cpu_percent);
        }
        if process.mem_percent > max_mem {
            max_mem = process.mem_percent;
            top.top_mem = describe(&process, process.mem_percent);
        }
    }
    top
}

fn describe(process: &ProcSample, percent: f32) -> String {
    format!(
        "{:.1}% {}[{}]: {}",
        percent, process.name, process.pid, process.cmdline
    )
}

/// Adapter over the live `sysinfo` process table. Processes that exit or
/// become unreadable during the refresh simply drop out of the table; the
/// scan never aborts on them.
pub fn scan_live(sys: &mut System) -> TopProcesses {
    sys.refresh_processes();
    let total_memory = sys.total_memory();
    scan(sys.processes().values().map(|process| ProcSample {
        pid: process.pid().as_u32(),
        name: process.name().to_string(),
        cpu_percent: process.cpu_usage(),
        mem_percent: if total_memory > 0 {
            (process.memory() as f64 / total_memory as f64 * 100.0) as f32
        } else {
            0.0
        },
        cmdline: process.cmd().join(" "),
    }))
}
