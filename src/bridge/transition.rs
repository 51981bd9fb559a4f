use super::Bridge;
use super::reconcile::log_failure;
use crate::catalog::Location;
use crate::provider::{ConnectionDriver, StatusReader};
use crate::publish::Publisher;
use crate::status::Status;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Unknown location: {0}")]
    UnknownLocation(String),
    #[error("Another location change is in progress")]
    Busy,
}

/// How a location request ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Already at the requested location; nothing was done
    AlreadyAt(Location),
    /// Disconnected as requested
    Disconnected,
    /// Connected and confirmed by the status output
    Connected { location: Location, attempts: u32 },
    /// Every attempt ran without the status reporting the location
    Unconfirmed { location: Location, attempts: u32 },
}

impl<R, D, P> Bridge<R, D, P>
where
    R: StatusReader,
    D: ConnectionDriver,
    P: Publisher,
{
    /// Move the VPN to a requested location
    ///
    /// `requested` is a location name from the catalog or `"None"` to
    /// disconnect. Unknown names and requests arriving while another one is
    /// running are rejected without touching the VPN.
    pub async fn request_location(
        &self,
        requested: &str,
    ) -> Result<TransitionOutcome, TransitionError> {
        let Some(target) = self.catalog.lookup(requested) else {
            warn!("Unknown location: {:?}", requested);
            return Err(TransitionError::UnknownLocation(requested.to_string()));
        };

        if target == self.location().await {
            warn!("Location is already: {}", target);
            return Ok(TransitionOutcome::AlreadyAt(target));
        }

        let outcome = {
            let Some(_busy) = self.begin_transition().await else {
                warn!("Ignoring request for {}, a location change is in progress", target);
                return Err(TransitionError::Busy);
            };
            self.transition_to(&target).await
        };

        self.publish_settled().await;
        Ok(outcome)
    }

    async fn transition_to(&self, target: &Location) -> TransitionOutcome {
        if !target.is_none() {
            log_failure(
                "status",
                self.publisher.publish_status(&Status::Connecting).await,
            );
        }

        info!("Disconnecting");
        if let Err(e) = self.driver.disconnect().await {
            debug!("Disconnect failed, ignoring: {}", e);
        }

        let Location::Named(name) = target else {
            return TransitionOutcome::Disconnected;
        };

        for attempt in 1..=self.connect_attempts {
            if attempt == 1 {
                info!("Connecting to: {}", name);
            } else {
                info!(
                    "Reconnecting to: {} (attempt {}/{})",
                    name, attempt, self.connect_attempts
                );
            }

            if let Err(e) = self.driver.connect(name).await {
                warn!("Connect command failed: {}", e);
            }

            match self.reader.poll().await {
                Ok(status) if self.catalog.resolve(&status) == *target => {
                    info!("Connected to: {}", name);
                    return TransitionOutcome::Connected {
                        location: target.clone(),
                        attempts: attempt,
                    };
                }
                Ok(status) => warn!("Cannot connect to: {} (status: {})", name, status),
                Err(e) => warn!("Cannot confirm connection to {}: {}", name, e),
            }
        }

        warn!(
            "Giving up on {} after {} attempts",
            name, self.connect_attempts
        );
        TransitionOutcome::Unconfirmed {
            location: target.clone(),
            attempts: self.connect_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::*;
    use super::*;
    use std::sync::Arc;

    fn nl_a() -> Location {
        Location::Named("NL-A".to_string())
    }

    #[tokio::test]
    async fn test_connect_confirmed_on_first_attempt() {
        let log = events();
        let vpn = Arc::new(MockVpn::new(log.clone(), Status::NotConnected));
        let bridge = bridge(&vpn, MockPublisher::new(log.clone())).await;

        let outcome = bridge.request_location("NL-A").await.unwrap();

        assert_eq!(
            outcome,
            TransitionOutcome::Connected {
                location: nl_a(),
                attempts: 1
            }
        );
        assert_eq!(
            recorded(&log),
            vec![
                Event::Status("Connecting...".to_string()),
                Event::Disconnect,
                Event::Connect("NL-A".to_string()),
                Event::Location("NL-A".to_string()),
                Event::Status("NL-A".to_string()),
            ]
        );
        assert!(!bridge.is_busy());
        assert_eq!(bridge.last_status().await, Status::ConnectedTo("NL-A".to_string()));
    }

    #[tokio::test]
    async fn test_provider_lag_exhausts_attempts() {
        let log = events();
        let vpn = Arc::new(
            MockVpn::new(log.clone(), Status::NotConnected).with_default_effect(ConnectEffect::Lag),
        );
        let bridge = bridge(&vpn, MockPublisher::new(log.clone())).await;

        let outcome = bridge.request_location("NL-A").await.unwrap();

        assert_eq!(
            outcome,
            TransitionOutcome::Unconfirmed {
                location: nl_a(),
                attempts: 3
            }
        );
        assert_eq!(vpn.connect_calls(), 3);
        assert!(!bridge.is_busy());
        assert_eq!(
            recorded(&log).last(),
            Some(&Event::Status("Not connected".to_string()))
        );
    }

    #[tokio::test]
    async fn test_failed_connect_consumes_an_attempt() {
        let log = events();
        let vpn = Arc::new(
            MockVpn::new(log.clone(), Status::NotConnected)
                .with_effects(&[ConnectEffect::Fail, ConnectEffect::Arrive]),
        );
        let bridge = bridge(&vpn, MockPublisher::new(log.clone())).await;

        let outcome = bridge.request_location("NL-A").await.unwrap();

        assert_eq!(
            outcome,
            TransitionOutcome::Connected {
                location: nl_a(),
                attempts: 2
            }
        );
        assert_eq!(vpn.connect_calls(), 2);
    }

    #[tokio::test]
    async fn test_unconfirmed_poll_errors_count_as_attempts() {
        let log = events();
        let vpn = Arc::new(MockVpn::new(log.clone(), Status::NotConnected));
        let bridge = bridge(&vpn, MockPublisher::new(log.clone())).await;

        vpn.set_poll_fails(true);
        let outcome = bridge.request_location("NL-A").await.unwrap();

        assert!(matches!(outcome, TransitionOutcome::Unconfirmed { attempts: 3, .. }));
        assert_eq!(vpn.connect_calls(), 3);
        assert!(!bridge.is_busy());
    }

    #[tokio::test]
    async fn test_request_for_current_location_is_noop() {
        let log = events();
        let vpn = Arc::new(MockVpn::new(log.clone(), Status::ConnectedTo("NL-A".to_string())));
        let bridge = bridge(&vpn, MockPublisher::new(log.clone())).await;

        let outcome = bridge.request_location("NL-A").await.unwrap();

        assert_eq!(outcome, TransitionOutcome::AlreadyAt(nl_a()));
        assert!(recorded(&log).is_empty());
    }

    #[tokio::test]
    async fn test_request_none_while_disconnected_is_noop() {
        let log = events();
        let vpn = Arc::new(MockVpn::new(log.clone(), Status::NotConnected));
        let bridge = bridge(&vpn, MockPublisher::new(log.clone())).await;

        let outcome = bridge.request_location("None").await.unwrap();

        assert_eq!(outcome, TransitionOutcome::AlreadyAt(Location::None));
        assert!(recorded(&log).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_location_is_rejected() {
        let log = events();
        let vpn = Arc::new(MockVpn::new(log.clone(), Status::NotConnected));
        let bridge = bridge(&vpn, MockPublisher::new(log.clone())).await;

        let result = bridge.request_location("Atlantis").await;

        assert_eq!(
            result,
            Err(TransitionError::UnknownLocation("Atlantis".to_string()))
        );
        assert!(recorded(&log).is_empty());
        assert!(!bridge.is_busy());
    }

    #[tokio::test]
    async fn test_request_none_disconnects() {
        let log = events();
        let vpn = Arc::new(MockVpn::new(log.clone(), Status::ConnectedTo("NL-A".to_string())));
        let bridge = bridge(&vpn, MockPublisher::new(log.clone())).await;

        let outcome = bridge.request_location("None").await.unwrap();

        assert_eq!(outcome, TransitionOutcome::Disconnected);
        assert_eq!(
            recorded(&log),
            vec![
                Event::Disconnect,
                Event::Location("None".to_string()),
                Event::Status("Not connected".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_switch_between_locations() {
        let log = events();
        let vpn = Arc::new(MockVpn::new(log.clone(), Status::ConnectedTo("NL-A".to_string())));
        let bridge = bridge(&vpn, MockPublisher::new(log.clone())).await;

        let outcome = bridge.request_location("NL-B").await.unwrap();

        assert!(matches!(outcome, TransitionOutcome::Connected { attempts: 1, .. }));
        assert_eq!(bridge.location().await, Location::Named("NL-B".to_string()));
        assert_eq!(
            &recorded(&log)[..3],
            &[
                Event::Status("Connecting...".to_string()),
                Event::Disconnect,
                Event::Connect("NL-B".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_request_while_busy_is_rejected() {
        let log = events();
        let hold = Arc::new(Hold::default());
        let vpn = Arc::new(
            MockVpn::new(log.clone(), Status::NotConnected).with_hold(hold.clone()),
        );
        let bridge = Arc::new(bridge(&vpn, MockPublisher::new(log.clone())).await);

        let first = tokio::spawn({
            let bridge = bridge.clone();
            async move { bridge.request_location("NL-A").await }
        });
        hold.entered.notified().await;

        let second = bridge.request_location("NL-B").await;
        assert_eq!(second, Err(TransitionError::Busy));

        hold.release.notify_one();
        let first = first.await.unwrap().unwrap();
        assert!(matches!(first, TransitionOutcome::Connected { .. }));
        assert_eq!(vpn.connect_calls(), 1);
        assert!(!bridge.is_busy());
    }

    #[tokio::test]
    async fn test_publish_failures_do_not_abort_transition() {
        let log = events();
        let vpn = Arc::new(MockVpn::new(log.clone(), Status::NotConnected));
        let bridge = bridge(&vpn, MockPublisher::failing(log.clone())).await;

        let outcome = bridge.request_location("NL-B").await.unwrap();

        assert!(matches!(outcome, TransitionOutcome::Connected { .. }));
        assert!(!bridge.is_busy());
    }
}
