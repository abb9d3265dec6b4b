//! Zabbix-class sink: declared in configuration, publish path stubbed.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use super::DispatchError;
use crate::config::ZabbixConfig;

const DEFAULT_SENDER_NAME: &str = "osmon";

pub struct ZabbixSink {
    host: String,
    name: String,
}

impl ZabbixSink {
    pub fn new(cfg: &ZabbixConfig) -> Self {
        Self {
            host: cfg.host.clone(),
            name: cfg.name.clone().unwrap_or_else(|| DEFAULT_SENDER_NAME.into()),
        }
    }

    /// Deliberate no-op: the zabbix sender protocol is not wired up yet.
    /// The sink still takes part in dispatch so configuration and logging
    /// behave as they will once it is real.
    pub fn publish_telemetry(
        &self,
        snapshot: &BTreeMap<String, Value>,
    ) -> Result<(), DispatchError> {
        debug!(
            host = %self.host,
            name = %self.name,
            keys = snapshot.len(),
            "zabbix publish skipped, sender not implemented"
        );
        Ok(())
    }
}
