//! Error types for the signaling client

use thiserror::Error;

/// Result type alias for signaling operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the signaling client
#[derive(Debug, Error)]
pub enum Error {
    /// Relay transport failed to connect or dropped unexpectedly
    #[error("Connection error: {0}")]
    Connection(String),

    /// Relay transport did not connect or acknowledge within the deadline
    #[error("Connection timed out after {0}s")]
    ConnectionTimeout(u64),

    /// The room join request was rejected by the relay
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Signaling protocol violation or misuse of the session
    #[error("Signaling error: {0}")]
    Signaling(String),

    /// A negotiation step against the peer transport failed
    #[error("Negotiation with peer {peer_id} failed: {reason}")]
    Negotiation {
        /// Remote peer the negotiation step targeted
        peer_id: String,
        /// Failure reported by the peer transport
        reason: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a [`Error::Negotiation`] from a transport failure
    pub fn negotiation(peer_id: impl Into<String>, reason: impl ToString) -> Self {
        Self::Negotiation {
            peer_id: peer_id.into(),
            reason: reason.to_string(),
        }
    }
}
