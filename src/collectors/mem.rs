//! Virtual and swap memory samplers, psutil-style field names.

use sysinfo::System;

use super::round1;
use crate::payload::MetricRecord;

pub fn virtual_memory(sys: &mut System) -> MetricRecord {
    sys.refresh_memory();
    let total = sys.total_memory();
    let available = sys.available_memory();
    MetricRecord::new("virtual_memory")
        .field("total", total as f64)
        .field("available", available as f64)
        .field("used", sys.used_memory() as f64)
        .field("free", sys.free_memory() as f64)
        .field("percent", used_percent(total.saturating_sub(available), total))
}

pub fn swap_memory(sys: &mut System) -> MetricRecord {
    sys.refresh_memory();
    let total = sys.total_swap();
    MetricRecord::new("swap_memory")
        .field("total", total as f64)
        .field("used", sys.used_swap() as f64)
        .field("free", sys.free_swap() as f64)
        .field("percent", used_percent(sys.used_swap(), total))
}

fn used_percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1(used as f64 / total as f64 * 100.0)
}
