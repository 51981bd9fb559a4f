//! ExpressVPN command-line client

use super::{ConnectError, ConnectionDriver, ProcessError, StatusReader};
use crate::catalog::LocationCatalog;
use crate::config::VpnConfig;
use crate::status::Status;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::debug;

pub struct ExpressVpn {
    binary: PathBuf,
    timeout: Duration,
    // One command at a time; the client daemon does not like overlapping calls.
    lock: Mutex<()>,
}

impl ExpressVpn {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
            lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &VpnConfig) -> Self {
        Self::new(
            config.binary.clone(),
            Duration::from_secs(config.command_timeout_secs),
        )
    }

    /// Raw output of `expressvpn list all`
    pub async fn list_locations(&self) -> Result<String, ProcessError> {
        let output = self.run_checked(&["list", "all"]).await?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Load the location catalog, favorites first
    pub async fn load_catalog(&self, favorites: &[String]) -> Result<LocationCatalog, ProcessError> {
        let raw = self.list_locations().await?;
        Ok(LocationCatalog::parse(&raw, favorites))
    }

    fn describe(&self, args: &[&str]) -> String {
        let mut command = self.binary.display().to_string();
        for arg in args {
            command.push(' ');
            command.push_str(arg);
        }
        command
    }

    async fn run(&self, args: &[&str]) -> Result<Output, ProcessError> {
        let command = self.describe(args);
        let _guard = self.lock.lock().await;
        debug!("Running {}", command);

        let mut cmd = Command::new(&self.binary);
        cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);

        match timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(source)) => Err(ProcessError::Spawn { command, source }),
            Err(_) => Err(ProcessError::Timeout {
                command,
                secs: self.timeout.as_secs(),
            }),
        }
    }

    async fn run_checked(&self, args: &[&str]) -> Result<Output, ProcessError> {
        let output = self.run(args).await?;
        if !output.status.success() {
            return Err(ProcessError::Failed {
                command: self.describe(args),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}

#[async_trait]
impl StatusReader for ExpressVpn {
    async fn poll(&self) -> Result<Status, ProcessError> {
        let output = self.run_checked(&["status"]).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(Status::from_output(&stdout))
    }
}

#[async_trait]
impl ConnectionDriver for ExpressVpn {
    async fn disconnect(&self) -> Result<(), ProcessError> {
        self.run_checked(&["disconnect"]).await?;
        Ok(())
    }

    async fn connect(&self, location: &str) -> Result<(), ConnectError> {
        let output = self.run(&["connect", location]).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = if stderr.trim().is_empty() {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(ConnectError::Rejected {
                location: location.to_string(),
                message,
            });
        }
        Ok(())
    }
}
