//! CPU-time percentage sampler.
//!
//! On Linux this parses the aggregate line of `/proc/stat` and reports each
//! CPU-time category as a percentage of the interval since the previous
//! sample (first sample: since boot). Elsewhere it falls back to the global
//! utilization figure from `sysinfo` as a single `busy` field.

use sysinfo::System;

use super::{round1, SamplerError};
use crate::payload::MetricRecord;

pub const RECORD_NAME: &str = "cpu_times_percent";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CpuTicks {
    user: u64,
    nice: u64,
    system: u64,
    idle: u64,
    iowait: u64,
    irq: u64,
    softirq: u64,
    steal: u64,
}

impl CpuTicks {
    fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    /// Counters are monotonic but can glitch backwards on some kernels,
    /// hence the saturating subtraction.
    fn since(&self, prev: &CpuTicks) -> CpuTicks {
        CpuTicks {
            user: self.user.saturating_sub(prev.user),
            nice: self.nice.saturating_sub(prev.nice),
            system: self.system.saturating_sub(prev.system),
            idle: self.idle.saturating_sub(prev.idle),
            iowait: self.iowait.saturating_sub(prev.iowait),
            irq: self.irq.saturating_sub(prev.irq),
            softirq: self.softirq.saturating_sub(prev.softirq),
            steal: self.steal.saturating_sub(prev.steal),
        }
    }
}

/// Keeps the previous counter totals for delta calculation across samples.
#[derive(Debug, Default)]
pub struct CpuSampler {
    prev: Option<CpuTicks>,
}

impl CpuSampler {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(target_os = "linux")]
    pub fn sample(&mut self, _sys: &mut System) -> Result<MetricRecord, SamplerError> {
        let content = std::fs::read_to_string("/proc/stat").map_err(|source| SamplerError::Read {
            path: "/proc/stat",
            source,
        })?;
        let current = parse_aggregate_line(&content)?;
        let window = match self.prev {
            Some(prev) => current.since(&prev),
            None => current,
        };
        self.prev = Some(current);
        Ok(percentages(&window))
    }

    #[cfg(not(target_os = "linux"))]
    pub fn sample(&mut self, sys: &mut System) -> Result<MetricRecord, SamplerError> {
        sys.refresh_cpu();
        Ok(MetricRecord::new(RECORD_NAME)
            .field("busy", round1(f64::from(sys.global_cpu_info().cpu_usage()))))
    }
}

fn parse_aggregate_line(content: &str) -> Result<CpuTicks, SamplerError> {
    let line = content
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or_else(|| SamplerError::Parse {
            what: "/proc/stat",
            detail: "missing aggregate cpu line".into(),
        })?;
    let mut fields = line
        .split_whitespace()
        .skip(1)
        .map(|f| f.parse::<u64>().unwrap_or(0));
    let mut next = || fields.next().unwrap_or(0);
    Ok(CpuTicks {
        user: next(),
        nice: next(),
        system: next(),
        idle: next(),
        iowait: next(),
        irq: next(),
        softirq: next(),
        steal: next(),
    })
}

fn percentages(window: &CpuTicks) -> MetricRecord {
    let total = window.total().max(1) as f64;
    let pct = |ticks: u64| round1(ticks as f64 / total * 100.0);
    MetricRecord::new(RECORD_NAME)
        .field("user", pct(window.user))
        .field("nice", pct(window.nice))
        .field("system", pct(window.system))
        .field("idle", pct(window.idle))
        .field("iowait", pct(window.iowait))
        .field("irq", pct(window.irq))
        .field("softirq", pct(window.softirq))
        .field("steal", pct(window.steal))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT: &str = "cpu  100 0 50 800 25 0 25 0 0 0\n\
                        cpu0 50 0 25 400 13 0 12 0 0 0\n\
                        intr 12345\n";

    #[test]
    fn parses_the_aggregate_line_only() {
        let ticks = parse_aggregate_line(STAT).expect("parse");
        assert_eq!(ticks.user, 100);
        assert_eq!(ticks.system, 50);
        assert_eq!(ticks.idle, 800);
        assert_eq!(ticks.iowait, 25);
        assert_eq!(ticks.softirq, 25);
        assert_eq!(ticks.total(), 1000);
    }

    #[test]
    fn missing_aggregate_line_is_a_parse_error() {
        assert!(parse_aggregate_line("intr 1 2 3\n").is_err());
    }

    #[test]
    fn percentages_cover_the_window() {
        let ticks = parse_aggregate_line(STAT).expect("parse");
        let record = percentages(&ticks);
        assert_eq!(record.name, RECORD_NAME);
        assert_eq!(record.fields.get("user"), Some(&10.0));
        assert_eq!(record.fields.get("system"), Some(&5.0));
        assert_eq!(record.fields.get("idle"), Some(&80.0));
        assert_eq!(record.fields.get("iowait"), Some(&2.5));
    }

    #[test]
    fn delta_window_is_relative_to_previous_sample() {
        let prev = parse_aggregate_line(STAT).expect("parse");
        let mut current = prev;
        current.user += 30;
        current.idle += 70;
        let window = current.since(&prev);
        assert_eq!(window.user, 30);
        assert_eq!(window.idle, 70);
        assert_eq!(window.system, 0);

        let record = percentages(&window);
        assert_eq!(record.fields.get("user"), Some(&30.0));
        assert_eq!(record.fields.get("idle"), Some(&70.0));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn live_sample_produces_the_expected_record() {
        let mut sys = System::new();
        let mut sampler = CpuSampler::new();
        let record = sampler.sample(&mut sys).expect("sample");
        assert_eq!(record.name, RECORD_NAME);
        for key in ["user", "system", "idle"] {
            let value = record.fields.get(key).copied().unwrap_or(-1.0);
            assert!((0.0..=100.0).contains(&value), "{key} out of range: {value}");
        }
    }
}
