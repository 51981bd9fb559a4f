//! Connection state controller
//!
//! [`Bridge`] owns the last observed VPN status and exposes two entry points
//! driven by the runner:
//!
//! - [`Bridge::tick`]: poll the VPN client, publish on change
//! - [`Bridge::request_location`]: move the VPN to a requested location
//!
//! While a transition runs, the busy flag is raised and ticks keep tracking
//! status without publishing it. The transition publishes the settled state
//! itself once it is done.

mod reconcile;
mod transition;

pub use transition::{TransitionError, TransitionOutcome};

use crate::catalog::{Location, LocationCatalog};
use crate::provider::{ConnectionDriver, ProcessError, StatusReader};
use crate::publish::Publisher;
use crate::status::Status;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::info;

pub struct Bridge<R, D, P> {
    catalog: LocationCatalog,
    reader: R,
    driver: D,
    publisher: P,
    connect_attempts: u32,
    last_status: Mutex<Status>,
    busy: AtomicBool,
    // Held while raising the busy flag and while observing or publishing state.
    gate: Mutex<()>,
}

/// Lowers the busy flag when dropped
struct BusyGuard<'a> {
    busy: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

impl<R, D, P> Bridge<R, D, P>
where
    R: StatusReader,
    D: ConnectionDriver,
    P: Publisher,
{
    /// Create the bridge, reading the initial status from the VPN client
    pub async fn new(
        catalog: LocationCatalog,
        reader: R,
        driver: D,
        publisher: P,
        connect_attempts: u32,
    ) -> Result<Self, ProcessError> {
        let status = reader.poll().await?;
        info!("Initial status: {}", status);

        Ok(Self {
            catalog,
            reader,
            driver,
            publisher,
            connect_attempts: connect_attempts.max(1),
            last_status: Mutex::new(status),
            busy: AtomicBool::new(false),
            gate: Mutex::new(()),
        })
    }

    pub fn catalog(&self) -> &LocationCatalog {
        &self.catalog
    }

    pub async fn last_status(&self) -> Status {
        self.last_status.lock().await.clone()
    }

    /// Location implied by the last observed status
    pub async fn location(&self) -> Location {
        self.catalog.resolve(&*self.last_status.lock().await)
    }

    /// Whether a transition is in flight
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    async fn begin_transition(&self) -> Option<BusyGuard<'_>> {
        let _gate = self.gate.lock().await;
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| BusyGuard { busy: &self.busy })
    }
}
