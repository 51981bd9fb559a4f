//! Configuration handling for the VPN bridge

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const LOCAL_CONFIG: &str = "vpn-bridge.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub home_assistant: Option<HomeAssistantConfig>,
    pub vpn: VpnConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub location_topic: String,
    pub status_topic: String,
    pub keep_alive_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HomeAssistantConfig {
    /// API root, e.g. `http://homeassistant.local:8123/api`
    pub base_url: String,
    /// Long-lived access token
    pub token: Option<String>,
    pub entity_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VpnConfig {
    pub binary: PathBuf,
    pub poll_interval_secs: u64,
    pub command_timeout_secs: u64,
    pub connect_attempts: u32,
    /// Locations listed first, in this order
    pub favorites: Vec<String>,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "vpn-bridge".to_string(),
            username: None,
            password: None,
            location_topic: "vpn/location".to_string(),
            status_topic: "vpn/status".to_string(),
            keep_alive_secs: 30,
        }
    }
}

impl Default for HomeAssistantConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8123/api".to_string(),
            token: None,
            entity_id: "input_select.vpn_location".to_string(),
        }
    }
}

impl Default for VpnConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("expressvpn"),
            poll_interval_secs: 1,
            command_timeout_secs: 60,
            connect_attempts: 3,
            favorites: [
                "Netherlands - The Hague",
                "UK - Docklands",
                "USA - New Jersey - 3",
                "USA - New Jersey - 2",
                "USA - Washington DC - 2",
                "Australia - Sydney - 3",
                "Canada - Toronto - 2",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from an explicit path, or the default locations
    ///
    /// Without an explicit path: `./vpn-bridge.toml`, then
    /// `~/.vpn-bridge/config.toml`, then built-in defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG);
        if local_config.exists() {
            return Self::load(&local_config);
        }

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".vpn-bridge").join("config.toml");
            if home_config.exists() {
                return Self::load(&home_config);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }
}
