//! MQTT side of the bridge
//!
//! The [`rumqttc::EventLoop`] returned from [`MqttPublisher::new`] must be
//! polled for publishes to reach the broker; the runner owns it.

use super::PublishError;
use crate::config::MqttConfig;
use crate::status::Status;
use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use std::time::Duration;
use tracing::debug;

const REQUEST_CAPACITY: usize = 16;

#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
    status_topic: String,
}

impl MqttPublisher {
    pub fn new(config: &MqttConfig) -> (Self, EventLoop) {
        let (client, eventloop) = AsyncClient::new(mqtt_options(config), REQUEST_CAPACITY);
        let publisher = Self {
            client,
            status_topic: config.status_topic.clone(),
        };
        (publisher, eventloop)
    }

    /// Publish the status as a retained message
    ///
    /// Never waits for the event loop: fails with [`PublishError::Mqtt`] when
    /// the request queue is full, e.g. while the broker is unreachable.
    pub async fn publish_status(&self, status: &Status) -> Result<(), PublishError> {
        debug!("Publishing {} to {}", status, self.status_topic);
        self.client.try_publish(
            self.status_topic.as_str(),
            QoS::AtLeastOnce,
            true,
            status.to_string(),
        )?;
        Ok(())
    }

    pub async fn subscribe(&self, topic: &str) -> Result<(), PublishError> {
        self.client.subscribe(topic, QoS::AtLeastOnce).await?;
        Ok(())
    }

    pub fn disconnect(&self) -> Result<(), PublishError> {
        self.client.try_disconnect()?;
        Ok(())
    }
}

fn mqtt_options(config: &MqttConfig) -> MqttOptions {
    let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
    options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
    if let Some(username) = &config.username {
        options.set_credentials(username, config.password.clone().unwrap_or_default());
    }
    options
}
