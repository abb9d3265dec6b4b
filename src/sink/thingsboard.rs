//! Thingsboard-class MQTT sink.
//!
//! Device auth follows the Thingsboard convention: username is the device
//! access token, password empty. Telemetry and one-shot attributes go to
//! separate topics from the same session.

use std::collections::BTreeMap;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, MqttOptions, QoS};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::DispatchError;
use crate::config::ThingsboardConfig;

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);
const KEEP_ALIVE: Duration = Duration::from_secs(30);
const RECONNECT_PAUSE: Duration = Duration::from_secs(5);

pub struct ThingsboardSink {
    client: AsyncClient,
    driver: JoinHandle<()>,
    telemetry_topic: String,
    attributes_topic: String,
}

impl ThingsboardSink {
    /// Opens the MQTT session and spawns its connection driver. Network
    /// errors surface later from the driver, not here; publishes made while
    /// the broker is unreachable are simply lost with a warning.
    pub fn connect(client_id: &str, cfg: &ThingsboardConfig) -> Self {
        let mut options = MqttOptions::new(
            format!("{}-{}", client_id, std::process::id()),
            cfg.host.clone(),
            cfg.port,
        );
        options.set_credentials(cfg.access_token.clone(), "");
        options.set_keep_alive(KEEP_ALIVE);
        let (client, mut eventloop) = AsyncClient::new(options, 16);
        let driver = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(packet)) => debug!(?packet, "mqtt incoming"),
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "mqtt connection error");
                        tokio::time::sleep(RECONNECT_PAUSE).await;
                    }
                }
            }
        });
        Self {
            client,
            driver,
            telemetry_topic: cfg.telemetry.clone(),
            attributes_topic: cfg.attributes.clone(),
        }
    }

    pub async fn publish_telemetry(
        &self,
        snapshot: &BTreeMap<String, Value>,
    ) -> Result<(), DispatchError> {
        self.publish(&self.telemetry_topic, snapshot).await
    }

    pub async fn publish_attributes(
        &self,
        attributes: &BTreeMap<String, Value>,
    ) -> Result<(), DispatchError> {
        self.publish(&self.attributes_topic, attributes).await
    }

    async fn publish(
        &self,
        topic: &str,
        body: &BTreeMap<String, Value>,
    ) -> Result<(), DispatchError> {
        let payload = serde_json::to_vec(body)?;
        let publish = self
            .client
            .publish(topic, QoS::AtLeastOnce, false, payload);
        match tokio::time::timeout(PUBLISH_TIMEOUT, publish).await {
            Ok(result) => result.map_err(DispatchError::from),
            Err(_) => Err(DispatchError::Timeout(PUBLISH_TIMEOUT)),
        }
    }

    pub async fn disconnect(&self) {
        if let Err(e) = self.client.disconnect().await {
            debug!(error = %e, "mqtt disconnect");
        }
        self.driver.abort();
    }
}
