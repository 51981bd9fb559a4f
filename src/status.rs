//! VPN connection status as reported by `expressvpn status`

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use tracing::warn;

static CONNECTED_TO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Connected\sto\s(.*)").expect("valid regex"));

/// Connection status derived from one poll of the VPN client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    NotConnected,
    Connecting,
    ConnectedTo(String),
}

impl Status {
    /// Classify raw `expressvpn status` output
    ///
    /// Returns `None` when the output matches none of the known forms.
    pub fn classify(output: &str) -> Option<Self> {
        if output.contains("Not connected") {
            return Some(Status::NotConnected);
        }
        if output.contains("Connecting") {
            return Some(Status::Connecting);
        }
        CONNECTED_TO
            .captures(output)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .filter(|name| !name.is_empty())
            .map(|name| Status::ConnectedTo(name.to_string()))
    }

    /// Classify output, treating anything unrecognised as not connected
    pub fn from_output(output: &str) -> Self {
        Self::classify(output).unwrap_or_else(|| {
            warn!(
                "Unrecognised status output, assuming not connected: {:?}",
                output.trim()
            );
            Status::NotConnected
        })
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::NotConnected => f.write_str("Not connected"),
            Status::Connecting => f.write_str("Connecting..."),
            Status::ConnectedTo(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_connected() {
        let output = "Connected to Japan - Tokyo\n\n- To check your connection status, type 'expressvpn status'.\n";
        assert_eq!(
            Status::classify(output),
            Some(Status::ConnectedTo("Japan - Tokyo".to_string()))
        );
    }

    #[test]
    fn test_classify_not_connected() {
        let output = "Not connected.\n\nA new version is available.\n";
        assert_eq!(Status::classify(output), Some(Status::NotConnected));
    }

    #[test]
    fn test_classify_connecting() {
        assert_eq!(
            Status::classify("Connecting to UK - Docklands...\n"),
            Some(Status::Connecting)
        );
    }

    #[test]
    fn test_classify_strips_carriage_return() {
        assert_eq!(
            Status::classify("Connected to NL-A\r\n"),
            Some(Status::ConnectedTo("NL-A".to_string()))
        );
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(Status::classify(""), None);
        assert_eq!(Status::classify("Connected to \n"), None);
        assert_eq!(Status::classify("Daemon is not running"), None);
    }

    #[test]
    fn test_from_output_defaults_to_not_connected() {
        assert_eq!(Status::from_output("garbage"), Status::NotConnected);
    }

    #[test]
    fn test_display() {
        assert_eq!(Status::NotConnected.to_string(), "Not connected");
        assert_eq!(Status::Connecting.to_string(), "Connecting...");
        assert_eq!(
            Status::ConnectedTo("USA - New Jersey - 3".to_string()).to_string(),
            "USA - New Jersey - 3"
        );
    }
}
