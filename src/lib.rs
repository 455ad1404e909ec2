//! Room-based WebRTC signaling client with multi-peer mesh negotiation
//!
//! Participants join a named room through a rendezvous relay, discover each
//! other, and establish direct peer connections via relayed offer/answer and
//! ICE candidate exchange. This crate owns the signaling and
//! peer-connection-lifecycle orchestration; the real-time transport itself
//! (ICE/DTLS/SRTP) is plugged in through the [`peer::PeerTransport`] trait.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  relay channel (WebSocket, or any SignalingChannel)  │
//! │  ↓ inbound events                                    │
//! │  SignalingSession (demux, one event at a time)       │
//! │  ├─ NegotiationEngine (offer/answer/ICE per peer)    │
//! │  ├─ RoomMembershipTracker (roster, connected flags)  │
//! │  └─ PeerConnectionRegistry (id → transport, lazy)    │
//! │     ↓                                                 │
//! │  application callbacks (roster, streams, disconnect) │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use roomrtc_signaling::{SignalingServerConfiguration, SignalingSession};
//!
//! let config = SignalingServerConfiguration {
//!     url: "ws://localhost:8080".to_string(),
//!     client_name: "alice".to_string(),
//!     room: "chat".to_string(),
//!     password: Some("secret".to_string()),
//!     ..Default::default()
//! };
//!
//! let session = SignalingSession::with_websocket(config, transport_factory)?;
//! session.on_room_clients_changed(|clients| println!("{clients:?}")).await;
//! session.connect().await?;
//! session.call_all().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod peer;
pub mod room;
pub mod session;
pub mod signaling;

pub use config::SignalingServerConfiguration;
pub use error::{Error, Result};
pub use peer::{MediaStream, PeerTransport, PeerTransportFactory, Role};
pub use session::SignalingSession;
pub use signaling::{
    ClientInfo, IceCandidate, RoomClient, SdpType, SessionDescription, SignalingCommand,
    SignalingEvent,
};

/// Get the version of this crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
