//! Peer connection registry and negotiation engine

pub mod negotiation;
pub mod registry;
pub mod transport;

pub use negotiation::NegotiationEngine;
pub use registry::{NegotiationState, PeerConnectionRegistry, PeerEntry};
pub use transport::{
    IceCandidateCallback, MediaStream, PeerTransport, PeerTransportFactory, RemoteMediaCallback,
    Role,
};
