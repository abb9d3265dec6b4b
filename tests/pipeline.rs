//! End-to-end pipeline checks: sample records through normalization and
//! aggregation, gated by independent cadences, out as one snapshot.

use std::time::{Duration, Instant};

use osmon::collectors::proc::{scan, ProcSample};
use osmon::payload::{flatten, MetricRecord, PayloadAggregator};
use osmon::sched::{MetricScheduler, SamplerId};
use serde_json::json;

fn cpu_record() -> MetricRecord {
    MetricRecord::new("cpu_times_percent")
        .field("user", 1.2)
        .field("system", 0.3)
}

fn mem_record() -> MetricRecord {
    MetricRecord::new("virtual_memory")
        .field("total", 8_589_934_592.0)
        .field("percent", 41.5)
}

fn process(pid: u32, name: &str, cpu: f32, mem: f32) -> ProcSample {
    ProcSample {
        pid,
        name: name.to_string(),
        cpu_percent: cpu,
        mem_percent: mem,
        cmdline: format!("./{name}"),
    }
}

#[test]
fn two_families_coalesce_into_one_snapshot() {
    let mut sched = MetricScheduler::new();
    sched.register(SamplerId::Cpu, Duration::from_secs(60));
    sched.register(SamplerId::Mem, Duration::from_secs(300));
    let mut agg = PayloadAggregator::new();

    let t0 = Instant::now();
    for id in [SamplerId::Cpu, SamplerId::Mem] {
        assert!(sched.is_due(id, t0), "first tick fires every sampler");
        sched.mark_ran(id, t0);
    }
    agg.merge(flatten(&cpu_record()));
    agg.merge(flatten(&mem_record()));

    let snapshot = agg.flush();
    assert_eq!(snapshot.get("cpu_times_percent_user"), Some(&json!(1.2)));
    assert_eq!(snapshot.get("cpu_times_percent_system"), Some(&json!(0.3)));
    assert_eq!(snapshot.get("virtual_memory_percent"), Some(&json!(41.5)));
    assert_eq!(snapshot.len(), 4);
    assert!(agg.is_empty());
}

#[test]
fn families_flush_on_their_own_cadence() {
    let mut sched = MetricScheduler::new();
    sched.register(SamplerId::Cpu, Duration::from_secs(60));
    sched.register(SamplerId::Mem, Duration::from_secs(300));
    let mut agg = PayloadAggregator::new();

    let t0 = Instant::now();
    sched.mark_ran(SamplerId::Cpu, t0);
    sched.mark_ran(SamplerId::Mem, t0);

    // 61s later only the CPU family is due; the next message carries CPU
    // keys alone.
    let t1 = t0 + Duration::from_secs(61);
    assert!(sched.is_due(SamplerId::Cpu, t1));
    assert!(!sched.is_due(SamplerId::Mem, t1));
    sched.mark_ran(SamplerId::Cpu, t1);
    agg.merge(flatten(&cpu_record()));

    let snapshot = agg.flush();
    assert!(snapshot.contains_key("cpu_times_percent_user"));
    assert!(!snapshot.keys().any(|k| k.starts_with("virtual_memory_")));
}

#[test]
fn top_process_descriptors_ride_the_cpu_flush() {
    let mut agg = PayloadAggregator::new();
    agg.merge(flatten(&cpu_record()));
    agg.merge(
        scan(vec![
            process(42, "miner", 87.3, 2.0),
            process(43, "cache", 3.0, 61.0),
        ])
        .entries(),
    );

    let snapshot = agg.flush();
    assert_eq!(
        snapshot.get("top_cpu"),
        Some(&json!("87.3% miner[42]: ./miner"))
    );
    assert_eq!(
        snapshot.get("top_mem"),
        Some(&json!("61.0% cache[43]: ./cache"))
    );
    assert!(snapshot.contains_key("cpu_times_percent_user"));
}

#[test]
fn successive_ticks_overwrite_stale_values_before_flush() {
    let mut agg = PayloadAggregator::new();
    agg.merge(flatten(&cpu_record()));
    agg.merge(flatten(
        &MetricRecord::new("cpu_times_percent").field("user", 9.9),
    ));

    let snapshot = agg.flush();
    assert_eq!(snapshot.get("cpu_times_percent_user"), Some(&json!(9.9)));
}
