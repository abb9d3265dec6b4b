//! The osmon agent: wires samplers, scheduler and aggregator into the
//! daemon lifecycle hooks and hands flushed snapshots to the dispatcher.

use std::time::{Duration, Instant};

use anyhow::Result;
use sysinfo::System;
use tracing::{debug, warn};

use crate::collectors::{cpu::CpuSampler, mem, os, proc};
use crate::config::Config;
use crate::daemon::Lifecycle;
use crate::payload::{flatten, PayloadAggregator};
use crate::sched::{MetricScheduler, SamplerId};
use crate::sink::Dispatcher;

pub struct Osmon {
    cfg: Config,
    sys: System,
    cpu: CpuSampler,
    sched: MetricScheduler,
    aggregator: PayloadAggregator,
    dispatcher: Option<Dispatcher>,
}

impl Osmon {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            sys: System::new_all(),
            cpu: CpuSampler::new(),
            sched: MetricScheduler::new(),
            aggregator: PayloadAggregator::new(),
            dispatcher: None,
        }
    }

    fn sample_cpu(&mut self) {
        match self.cpu.sample(&mut self.sys) {
            Ok(record) => self.aggregator.merge(flatten(&record)),
            Err(e) => warn!(error = %e, "cpu sample failed"),
        }
        self.aggregator.merge(proc::scan_live(&mut self.sys).entries());
    }

    fn sample_mem(&mut self) {
        self.aggregator.merge(flatten(&mem::virtual_memory(&mut self.sys)));
        self.aggregator.merge(flatten(&mem::swap_memory(&mut self.sys)));
    }
}

impl Lifecycle for Osmon {
    async fn on_start(&mut self) -> Result<()> {
        self.sched
            .register(SamplerId::Cpu, Duration::from_secs(self.cfg.timer_cpu));
        self.sched
            .register(SamplerId::Mem, Duration::from_secs(self.cfg.timer_mem));
        let dispatcher = Dispatcher::connect(&self.cfg);
        dispatcher.dispatch_sysinfo(&os::sys_info(&self.sys)).await;
        self.dispatcher = Some(dispatcher);
        Ok(())
    }

    async fn on_run(&mut self) {
        let now = Instant::now();
        if self.sched.is_due(SamplerId::Cpu, now) {
            // Marked before the sample lands so a slow sampler cannot
            // re-fire on every tick.
            self.sched.mark_ran(SamplerId::Cpu, now);
            self.sample_cpu();
        }
        if self.sched.is_due(SamplerId::Mem, now) {
            self.sched.mark_ran(SamplerId::Mem, now);
            self.sample_mem();
        }
        if !self.aggregator.is_empty() {
            let snapshot = self.aggregator.flush();
            debug!(keys = snapshot.len(), "flushing payload");
            if let Some(dispatcher) = &self.dispatcher {
                dispatcher.dispatch_telemetry(&snapshot).await;
            }
        }
    }

    async fn on_stop(&mut self) {
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThingsboardConfig;

    #[tokio::test]
    async fn run_cycle_fills_and_clears_the_payload() {
        let mut agent = Osmon::new(Config::default());
        agent.on_start().await.expect("start");

        agent.on_run().await;
        // Both families were due on the first tick and the flush cleared
        // the aggregator even with no sink configured.
        assert!(agent.aggregator.is_empty());

        // Immediately after, nothing is due and nothing accumulates.
        agent.on_run().await;
        assert!(agent.aggregator.is_empty());
        agent.on_stop().await;
    }

    #[tokio::test]
    async fn unreachable_sink_never_crashes_the_cycle() {
        let mut cfg = Config::default();
        cfg.thingsboard = Some(ThingsboardConfig {
            host: "127.0.0.1".into(),
            // Nothing listens here; the connection driver logs and retries
            // while publishes are queued and eventually dropped.
            port: 1,
            telemetry: "t".into(),
            attributes: "a".into(),
            access_token: String::new(),
            name: None,
        });
        let mut agent = Osmon::new(cfg);
        agent.on_start().await.expect("start");
        agent.on_run().await;
        assert!(agent.aggregator.is_empty());
        agent.on_stop().await;
    }
}
