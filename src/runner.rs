//! Bridge daemon: wires the VPN client, MQTT and Home Assistant together
//!
//! Three activities run side by side:
//!
//! 1. the MQTT event loop, which forwards location requests and re-announces
//!    state after every (re)connection to the broker
//! 2. a ticker calling [`Bridge::tick`] at the configured poll interval
//! 3. a worker running location requests one at a time from a single-slot
//!    queue; requests arriving while the slot is taken are dropped

use crate::bridge::Bridge;
use crate::config::Config;
use crate::provider::{ExpressVpn, ProcessError};
use crate::publish::{BridgePublisher, HomeAssistant, MqttPublisher, PublishError};
use rumqttc::{Event, Packet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{debug, info, warn};

const RECONNECT_DELAY_SECS: u64 = 5;

type LiveBridge = Bridge<Arc<ExpressVpn>, Arc<ExpressVpn>, BridgePublisher>;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("VPN client error: {0}")]
    ProcessError(#[from] ProcessError),
    #[error("Publisher setup failed: {0}")]
    PublishError(#[from] PublishError),
}

/// Run the bridge until Ctrl-C
pub async fn run(config: Config) -> Result<(), RunError> {
    let vpn = Arc::new(ExpressVpn::from_config(&config.vpn));
    let catalog = vpn.load_catalog(&config.vpn.favorites).await?;
    info!("Loaded {} locations", catalog.len());

    let (mqtt, mut eventloop) = MqttPublisher::new(&config.mqtt);
    let home_assistant = config
        .home_assistant
        .as_ref()
        .map(HomeAssistant::new)
        .transpose()?;
    if home_assistant.is_none() {
        info!("Home Assistant not configured, publishing status over MQTT only");
    }

    let publisher = BridgePublisher::new(mqtt.clone(), home_assistant);
    let bridge = Arc::new(
        Bridge::new(
            catalog,
            vpn.clone(),
            vpn,
            publisher,
            config.vpn.connect_attempts,
        )
        .await?,
    );

    let (requests, inbox) = mpsc::channel(1);
    let worker = tokio::spawn(request_worker(bridge.clone(), inbox));
    let ticker = tokio::spawn(poll_loop(
        bridge.clone(),
        Duration::from_secs(config.vpn.poll_interval_secs.max(1)),
    ));

    let location_topic = config.mqtt.location_topic.clone();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut backing_off = false;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutting down");
                break;
            }
            _ = sleep(Duration::from_secs(RECONNECT_DELAY_SECS)), if backing_off => {
                backing_off = false;
            }
            event = eventloop.poll(), if !backing_off => match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("Connected to MQTT broker");
                    tokio::spawn(on_broker_connected(
                        bridge.clone(),
                        mqtt.clone(),
                        location_topic.clone(),
                    ));
                }
                Ok(Event::Incoming(Packet::Publish(publish))) if publish.topic == location_topic => {
                    enqueue(&requests, &publish.payload);
                }
                Ok(event) => debug!("MQTT event: {:?}", event),
                Err(e) => {
                    warn!("MQTT connection error: {}, retrying in {}s", e, RECONNECT_DELAY_SECS);
                    backing_off = true;
                }
            }
        }
    }

    ticker.abort();
    worker.abort();
    if let Err(e) = mqtt.disconnect() {
        debug!("MQTT disconnect failed: {}", e);
    }
    Ok(())
}

async fn on_broker_connected(bridge: Arc<LiveBridge>, mqtt: MqttPublisher, location_topic: String) {
    match mqtt.subscribe(&location_topic).await {
        Ok(()) => info!("Subscribed to {}", location_topic),
        Err(e) => warn!("Failed to subscribe to {}: {}", location_topic, e),
    }
    bridge.announce().await;
}

async fn poll_loop(bridge: Arc<LiveBridge>, period: Duration) {
    let mut ticks = interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticks.tick().await;
        if let Err(e) = bridge.tick().await {
            warn!("Status poll failed: {}", e);
        }
    }
}

async fn request_worker(bridge: Arc<LiveBridge>, mut inbox: mpsc::Receiver<String>) {
    while let Some(request) = inbox.recv().await {
        match bridge.request_location(&request).await {
            Ok(outcome) => info!("Request for {} finished: {:?}", request, outcome),
            Err(e) => warn!("Request for {} dropped: {}", request, e),
        }
    }
}

/// Queue a location request from a raw MQTT payload
///
/// Returns whether the request was queued.
fn enqueue(requests: &mpsc::Sender<String>, payload: &[u8]) -> bool {
    let Ok(request) = std::str::from_utf8(payload) else {
        warn!("Ignoring location request that is not UTF-8");
        return false;
    };

    match requests.try_send(request.trim().to_string()) {
        Ok(()) => true,
        Err(TrySendError::Full(request)) => {
            warn!("Dropping request for {}, another request is pending", request);
            false
        }
        Err(TrySendError::Closed(request)) => {
            warn!("Dropping request for {}, worker has stopped", request);
            false
        }
    }
}
