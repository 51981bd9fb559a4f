//! VPN Bridge - ExpressVPN state over MQTT and Home Assistant
//!
//! This crate mirrors the connection state of the local ExpressVPN client to
//! an MQTT topic and a Home Assistant `input_select`, and lets automations
//! move the VPN by publishing a desired location.
//!
//! # Architecture
//!
//! - `config`: Configuration file handling (TOML)
//! - `status`: Status classification of `expressvpn status` output
//! - `catalog`: Location listing parser and lookup
//! - `provider`: ExpressVPN process integration
//! - `publish`: MQTT and Home Assistant publishers
//! - `bridge`: Reconciliation loop and location transitions
//! - `runner`: Daemon wiring
//!
//! # Topics
//!
//! ```text
//! vpn/location  <- "UK - Docklands" | "None"
//! vpn/status    -> "Not connected" | "Connecting..." | "UK - Docklands"
//! ```

pub mod bridge;
pub mod catalog;
pub mod config;
pub mod provider;
pub mod publish;
pub mod runner;
pub mod status;

pub use bridge::{Bridge, TransitionError, TransitionOutcome};
pub use catalog::{Location, LocationCatalog};
pub use config::Config;
pub use runner::run;
pub use status::Status;
