use super::Bridge;
use crate::provider::{ConnectionDriver, ProcessError, StatusReader};
use crate::publish::{PublishError, Publisher};
use crate::status::Status;
use tracing::{debug, info, warn};

impl<R, D, P> Bridge<R, D, P>
where
    R: StatusReader,
    D: ConnectionDriver,
    P: Publisher,
{
    /// Poll the VPN client once and publish if the status changed
    ///
    /// Returns the new status when it differs from the last observed one.
    /// During a transition the status is recorded but not published.
    pub async fn tick(&self) -> Result<Option<Status>, ProcessError> {
        // Poll, compare, record and publish as one step against settle.
        let _gate = self.gate.lock().await;
        let status = self.reader.poll().await?;

        {
            let mut last = self.last_status.lock().await;
            if *last == status {
                return Ok(None);
            }
            info!("Status changed: {} -> {}", *last, status);
            *last = status.clone();
        }

        if self.is_busy() {
            debug!("Transition in progress, holding back {}", status);
        } else {
            self.publish_state(&status).await;
        }
        Ok(Some(status))
    }

    /// Publish everything a fresh subscriber needs
    ///
    /// Called after each (re)connection to the broker. Status and location are
    /// left to the transition when one is running.
    pub async fn announce(&self) {
        let _gate = self.gate.lock().await;
        let status = self.last_status.lock().await.clone();
        let busy = self.is_busy();

        if !busy {
            log_failure("status", self.publisher.publish_status(&status).await);
        }
        log_failure(
            "location options",
            self.publisher
                .publish_location_options(&self.catalog.options())
                .await,
        );
        if !busy {
            let location = self.catalog.resolve(&status);
            log_failure("location", self.publisher.publish_location(&location).await);
        }
    }

    /// Re-read the status and publish it, after a transition has settled
    pub(super) async fn publish_settled(&self) {
        let _gate = self.gate.lock().await;
        match self.reader.poll().await {
            Ok(status) => {
                *self.last_status.lock().await = status.clone();
                self.publish_state(&status).await;
            }
            Err(e) => warn!("Cannot read status after transition: {}", e),
        }
    }

    // Callers hold the gate.
    async fn publish_state(&self, status: &Status) {
        let location = self.catalog.resolve(status);
        log_failure("location", self.publisher.publish_location(&location).await);
        log_failure("status", self.publisher.publish_status(status).await);
    }
}

/// Publishing is best-effort; the next change publishes again
pub(super) fn log_failure(what: &str, result: Result<(), PublishError>) {
    if let Err(e) = result {
        warn!("Failed to publish {}: {}", what, e);
    }
}
