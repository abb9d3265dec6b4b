//! Per-sampler cadence gating.
//!
//! Each sampler has its own elapsed-time cadence, decoupled from the tick
//! and flush cadence: cheap high-frequency metrics and expensive
//! low-frequency ones share one outbound message without either forcing the
//! other's schedule.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Identifies one sampler family in the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerId {
    Cpu,
    Mem,
}

#[derive(Debug)]
struct Entry {
    cadence: Duration,
    last_run: Option<Instant>,
}

#[derive(Debug, Default)]
pub struct MetricScheduler {
    entries: HashMap<SamplerId, Entry>,
}

impl MetricScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sampler. The first `is_due` check after registration
    /// always fires.
    pub fn register(&mut self, id: SamplerId, cadence: Duration) {
        self.entries.insert(
            id,
            Entry {
                cadence,
                last_run: None,
            },
        );
    }

    /// Due when strictly more than one cadence has elapsed since the last
    /// recorded run. Unregistered samplers are never due.
    pub fn is_due(&self, id: SamplerId, now: Instant) -> bool {
        match self.entries.get(&id) {
            Some(entry) => entry
                .last_run
                .map_or(true, |last| now.duration_since(last) > entry.cadence),
            None => false,
        }
    }

    /// Records a run. Callers invoke this before the sample result is
    /// delivered, so a slow or failing sampler cannot re-fire on every tick.
    pub fn mark_ran(&mut self, id: SamplerId, now: Instant) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.last_run = Some(now);
        }
    }
}
