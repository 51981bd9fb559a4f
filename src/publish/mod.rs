//! Outbound state publishing
//!
//! Status goes to the MQTT status topic. The current location and the list
//! of selectable locations go to a Home Assistant `input_select` entity over
//! REST, when configured.

pub mod home_assistant;
pub mod mqtt;

use crate::catalog::Location;
use crate::status::Status;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use home_assistant::HomeAssistant;
pub use mqtt::MqttPublisher;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("MQTT publish failed: {0}")]
    Mqtt(#[from] rumqttc::ClientError),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{path} returned HTTP {status}")]
    Status { path: String, status: u16 },
}

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish_status(&self, status: &Status) -> Result<(), PublishError>;
    async fn publish_location(&self, location: &Location) -> Result<(), PublishError>;
    async fn publish_location_options(&self, options: &[String]) -> Result<(), PublishError>;
}

#[async_trait]
impl<T: Publisher + ?Sized> Publisher for Arc<T> {
    async fn publish_status(&self, status: &Status) -> Result<(), PublishError> {
        (**self).publish_status(status).await
    }

    async fn publish_location(&self, location: &Location) -> Result<(), PublishError> {
        (**self).publish_location(location).await
    }

    async fn publish_location_options(&self, options: &[String]) -> Result<(), PublishError> {
        (**self).publish_location_options(options).await
    }
}

/// MQTT for status, Home Assistant (optional) for location and options
pub struct BridgePublisher {
    mqtt: MqttPublisher,
    home_assistant: Option<HomeAssistant>,
}

impl BridgePublisher {
    pub fn new(mqtt: MqttPublisher, home_assistant: Option<HomeAssistant>) -> Self {
        Self {
            mqtt,
            home_assistant,
        }
    }
}

#[async_trait]
impl Publisher for BridgePublisher {
    async fn publish_status(&self, status: &Status) -> Result<(), PublishError> {
        self.mqtt.publish_status(status).await
    }

    async fn publish_location(&self, location: &Location) -> Result<(), PublishError> {
        match &self.home_assistant {
            Some(ha) => ha.select_option(&location.to_string()).await,
            None => Ok(()),
        }
    }

    async fn publish_location_options(&self, options: &[String]) -> Result<(), PublishError> {
        match &self.home_assistant {
            Some(ha) => ha.set_options(options).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MqttConfig;

    #[test]
    fn test_publish_error_display() {
        let err = PublishError::Status {
            path: "/services/input_select/select_option".to_string(),
            status: 401,
        };
        assert_eq!(
            err.to_string(),
            "/services/input_select/select_option returned HTTP 401"
        );
    }

    #[tokio::test]
    async fn test_location_publishes_skip_without_home_assistant() {
        let (mqtt, _eventloop) = MqttPublisher::new(&MqttConfig::default());
        let publisher = BridgePublisher::new(mqtt, None);

        assert!(publisher.publish_location(&Location::None).await.is_ok());
        assert!(
            publisher
                .publish_location_options(&["None".to_string()])
                .await
                .is_ok()
        );
    }
}
