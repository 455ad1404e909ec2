//! Peer transport abstraction
//!
//! The actual real-time transport (ICE/DTLS/SRTP peer connection) is an
//! external collaborator. The negotiation engine only drives the
//! offer/answer/candidate surface below; everything past description and
//! candidate exchange stays inside the implementation.

use crate::signaling::protocol::{IceCandidate, SessionDescription};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Opaque remote media delivered by a peer transport
///
/// The session forwards these to the application untouched; what a stream
/// actually is (tracks, decoders, sinks) belongs to the transport
/// implementation.
pub trait MediaStream: Send + Sync {}

/// Callback invoked when the transport discovers a local ICE candidate
///
/// `None` marks the end of candidate gathering.
pub type IceCandidateCallback = Arc<dyn Fn(Option<IceCandidate>) + Send + Sync>;

/// Callback invoked when remote media becomes available
pub type RemoteMediaCallback = Arc<dyn Fn(Arc<dyn MediaStream>) + Send + Sync>;

/// Negotiation role of the local side for one peer connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Local side initiates with an offer
    Offerer,
    /// Local side responds with an answer
    Answerer,
}

/// One peer connection as seen by the negotiation engine
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Create a local offer description
    async fn create_offer(&self) -> Result<SessionDescription>;

    /// Create a local answer description
    ///
    /// The remote offer must have been applied first.
    async fn create_answer(&self) -> Result<SessionDescription>;

    /// Apply a local description
    async fn set_local_description(&self, description: SessionDescription) -> Result<()>;

    /// Apply a remote description
    async fn set_remote_description(&self, description: SessionDescription) -> Result<()>;

    /// Apply a remote ICE candidate
    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    /// Replace the candidate-discovered callback (`None` detaches it)
    fn set_on_ice_candidate(&self, callback: Option<IceCandidateCallback>);

    /// Replace the remote-media callback (`None` detaches it)
    fn set_on_remote_media(&self, callback: Option<RemoteMediaCallback>);
}

/// Builds one [`PeerTransport`] per remote peer
pub trait PeerTransportFactory: Send + Sync {
    /// Create a transport for the given remote peer
    fn create(&self, remote_id: &str, role: Role) -> Result<Arc<dyn PeerTransport>>;
}
