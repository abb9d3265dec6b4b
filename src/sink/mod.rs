//! Sink dispatch with per-sink failure isolation.
//!
//! Each sink call returns its own result; the dispatcher logs failures and
//! keeps going, so one sink can never block another and nothing propagates
//! back into the tick loop. Failed dispatches are not retried: the flushed
//! snapshot for that cycle is gone. That data loss is documented behavior.

pub mod thingsboard;
pub mod zabbix;

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

use crate::config::Config;
use thingsboard::ThingsboardSink;
use zabbix::ZabbixSink;

/// Failure of one publish attempt to one sink.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("serializing payload: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("mqtt publish: {0}")]
    Publish(#[from] rumqttc::ClientError),
    #[error("publish timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Fans one flushed snapshot out to every configured sink. A sink counts as
/// configured iff its `host` was present in the merged configuration; an
/// unconfigured sink is never invoked.
pub struct Dispatcher {
    thingsboard: Option<ThingsboardSink>,
    zabbix: Option<ZabbixSink>,
}

impl Dispatcher {
    pub fn connect(cfg: &Config) -> Self {
        let thingsboard = cfg.thingsboard.as_ref().map(|tb| {
            info!(host = %tb.host, "send messages to thingsboard");
            ThingsboardSink::connect(&cfg.name, tb)
        });
        let zabbix = cfg.zabbix.as_ref().map(|zb| {
            info!(host = %zb.host, "send messages to zabbix");
            ZabbixSink::new(zb)
        });
        Self {
            thingsboard,
            zabbix,
        }
    }

    /// One-shot host inventory to the attributes channel. Errors are logged
    /// and swallowed; a publish failure must not crash startup.
    pub async fn dispatch_sysinfo(&self, inventory: &BTreeMap<String, Value>) {
        if let Some(tb) = &self.thingsboard {
            if let Err(e) = tb.publish_attributes(inventory).await {
                error!(sink = "thingsboard", error = %e, "publish sysinfo failed");
            }
        }
    }

    /// Periodic telemetry. Every configured sink is attempted regardless of
    /// what the previous one returned.
    pub async fn dispatch_telemetry(&self, snapshot: &BTreeMap<String, Value>) {
        if snapshot.is_empty() {
            return;
        }
        if let Some(tb) = &self.thingsboard {
            if let Err(e) = tb.publish_telemetry(snapshot).await {
                error!(sink = "thingsboard", error = %e, "publish telemetry failed");
            }
        }
        if let Some(zb) = &self.zabbix {
            if let Err(e) = zb.publish_telemetry(snapshot) {
                error!(sink = "zabbix", error = %e, "publish telemetry failed");
            }
        }
    }

    pub async fn shutdown(&self) {
        if let Some(tb) = &self.thingsboard {
            tb.disconnect().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ZabbixConfig;
    use serde_json::json;

    #[tokio::test]
    async fn unconfigured_sinks_are_never_connected() {
        let dispatcher = Dispatcher::connect(&Config::default());
        assert!(dispatcher.thingsboard.is_none());
        assert!(dispatcher.zabbix.is_none());

        // Nothing to send to, but dispatch must still be a safe no-op.
        let mut snapshot = BTreeMap::new();
        snapshot.insert("cpu_times_percent_user".to_string(), json!(1.5));
        dispatcher.dispatch_telemetry(&snapshot).await;
        dispatcher.dispatch_sysinfo(&snapshot).await;
    }

    #[tokio::test]
    async fn lone_zabbix_sink_still_gets_dispatched() {
        let mut cfg = Config::default();
        cfg.zabbix = Some(ZabbixConfig {
            host: "zabbix.local".into(),
            name: None,
        });
        let dispatcher = Dispatcher::connect(&cfg);
        assert!(dispatcher.thingsboard.is_none());
        assert!(dispatcher.zabbix.is_some());

        let mut snapshot = BTreeMap::new();
        snapshot.insert("swap_memory_percent".to_string(), json!(0.0));
        dispatcher.dispatch_telemetry(&snapshot).await;
    }
}
