//! VPN client process integration

pub mod expressvpn;

use crate::status::Status;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use expressvpn::ExpressVpn;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("`{command}` timed out after {secs}s")]
    Timeout { command: String, secs: u64 },
    #[error("`{command}` exited with {code:?}: {stderr}")]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("Connect to {location} rejected: {message}")]
    Rejected { location: String, message: String },
    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Reads ground-truth connection status from the VPN client
#[async_trait]
pub trait StatusReader: Send + Sync {
    async fn poll(&self) -> Result<Status, ProcessError>;
}

/// Issues connect and disconnect commands to the VPN client
#[async_trait]
pub trait ConnectionDriver: Send + Sync {
    /// Disconnect from the current location
    ///
    /// Fails harmlessly when nothing is connected; callers are expected to
    /// ignore the error.
    async fn disconnect(&self) -> Result<(), ProcessError>;

    /// Connect to a location; a single attempt with no retry
    async fn connect(&self, location: &str) -> Result<(), ConnectError>;
}

#[async_trait]
impl<T: StatusReader + ?Sized> StatusReader for Arc<T> {
    async fn poll(&self) -> Result<Status, ProcessError> {
        (**self).poll().await
    }
}

#[async_trait]
impl<T: ConnectionDriver + ?Sized> ConnectionDriver for Arc<T> {
    async fn disconnect(&self) -> Result<(), ProcessError> {
        (**self).disconnect().await
    }

    async fn connect(&self, location: &str) -> Result<(), ConnectError> {
        (**self).connect(location).await
    }
}
