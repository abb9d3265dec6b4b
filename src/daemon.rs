//! Daemon lifecycle: hook trait, state machine, fixed-tick runner.
//!
//! The runner owns scheduling and signals; the agent only implements the
//! three hook bodies. `on_run` always runs to completion before the next
//! invocation, so hook bodies need no internal locking.

use std::time::Duration;

use anyhow::Result;
use tracing::info;

/// Hook surface an agent exposes to the surrounding daemon loop.
#[allow(async_fn_in_trait)]
pub trait Lifecycle {
    /// Invoked once before any tick.
    async fn on_start(&mut self) -> Result<()>;
    /// Invoked every tick; completes before the next invocation.
    async fn on_run(&mut self);
    /// Invoked once on graceful termination.
    async fn on_stop(&mut self);
}

/// Runner states. Hooks fire on the transitions between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

pub struct Runner {
    tick: Duration,
    state: DaemonState,
}

impl Runner {
    pub fn new(tick: Duration) -> Self {
        Self {
            tick,
            state: DaemonState::Stopped,
        }
    }

    pub fn state(&self) -> DaemonState {
        self.state
    }

    /// Drives the lifecycle until SIGINT or SIGTERM. Shutdown is not
    /// transactional: an in-flight dispatch may be abandoned.
    pub async fn run<L: Lifecycle>(&mut self, agent: &mut L) -> Result<()> {
        self.state = DaemonState::Starting;
        if let Err(e) = agent.on_start().await {
            self.state = DaemonState::Stopped;
            return Err(e);
        }
        self.state = DaemonState::Running;
        info!(tick_ms = self.tick.as_millis() as u64, "daemon running");

        let mut ticks = tokio::time::interval(self.tick);
        ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = ticks.tick() => agent.on_run().await,
                _ = &mut shutdown => break,
            }
        }

        self.state = DaemonState::Stopping;
        info!("shutting down");
        agent.on_stop().await;
        self.state = DaemonState::Stopped;
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "sigterm handler unavailable");
                let _ = ctrl_c.await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
