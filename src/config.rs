//! Configuration types for the signaling session

use serde::{Deserialize, Serialize};

/// Connection parameters for the signaling server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalingServerConfiguration {
    /// WebSocket signaling server URL (ws:// or wss://)
    pub url: String,

    /// Display name announced to the room
    pub client_name: String,

    /// Room to join
    pub room: String,

    /// Opaque room credential, forwarded verbatim to the relay
    pub password: Option<String>,

    /// Deadline for transport connect and join acknowledgement, in seconds
    /// (default: 30)
    pub connect_timeout_secs: u64,
}

impl Default for SignalingServerConfiguration {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8080".to_string(),
            client_name: String::new(),
            room: String::new(),
            password: None,
            connect_timeout_secs: 30,
        }
    }
}

impl SignalingServerConfiguration {
    /// Validate configuration parameters
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `url` is not a valid WebSocket URL
    /// - `client_name` or `room` is empty
    /// - `connect_timeout_secs` is zero
    pub fn validate(&self) -> crate::Result<()> {
        use crate::Error;

        if !self.url.starts_with("ws://") && !self.url.starts_with("wss://") {
            return Err(Error::InvalidConfig(format!(
                "url must start with ws:// or wss://, got {}",
                self.url
            )));
        }

        if self.client_name.is_empty() {
            return Err(Error::InvalidConfig(
                "client_name must not be empty".to_string(),
            ));
        }

        if self.room.is_empty() {
            return Err(Error::InvalidConfig("room must not be empty".to_string()));
        }

        if self.connect_timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "connect_timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
