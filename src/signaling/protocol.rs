//! Wire types for the signaling protocol
//!
//! Inbound events and outbound commands are tagged JSON messages:
//! `{"event": "<name>", "data": <payload>}`. Field names follow the
//! JavaScript conventions of the relay (`fromId`, `toId`, ...).

use serde::{Deserialize, Serialize};

/// A room participant as announced by the relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Stable opaque identifier assigned by the relay
    pub id: String,
    /// Display name
    pub name: String,
}

/// A room participant with its derived peer-connection status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomClient {
    /// Stable opaque identifier assigned by the relay
    pub id: String,
    /// Display name
    pub name: String,
    /// True when a peer connection entry exists for this client, or the
    /// client is the local participant
    pub is_connected: bool,
}

/// Session description type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    /// Offer created by the caller
    Offer,
    /// Answer created by the callee
    Answer,
}

/// An SDP session description exchanged through the relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    /// Description type (offer or answer)
    #[serde(rename = "type")]
    pub kind: SdpType,
    /// SDP payload
    pub sdp: String,
}

impl SessionDescription {
    /// Build an offer description
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    /// Build an answer description
    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// An ICE candidate exchanged through the relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    /// Candidate line
    pub candidate: String,
    /// Media stream identification tag
    #[serde(rename = "sdpMid")]
    pub sdp_mid: Option<String>,
    /// Index of the media description the candidate belongs to
    #[serde(rename = "sdpMLineIndex")]
    pub sdp_mline_index: Option<u16>,
}

/// Room join request sent right after the transport connects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRoomRequest {
    /// Display name announced to the room
    pub name: String,
    /// Room to join
    pub room: String,
    /// Opaque room credential
    pub password: Option<String>,
}

/// Acknowledgement for a [`JoinRoomRequest`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomAck {
    /// Whether the relay accepted the join request
    pub joined: bool,
    /// Local participant id assigned by the relay on success
    pub client_id: Option<String>,
}

/// Inbound relay events consumed by the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
#[serde(rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum SignalingEvent {
    /// Full roster replacement
    RoomClients(Vec<ClientInfo>),
    /// Instruction to initiate calls to the listed ids
    MakePeerCall(Vec<String>),
    /// Offer received from a remote peer
    PeerCallReceived {
        /// Calling peer
        from_id: String,
        /// Offer description
        offer: SessionDescription,
    },
    /// Answer received from a remote peer
    PeerCallAnswerReceived {
        /// Answering peer
        from_id: String,
        /// Answer description; absent when the peer declined the call
        #[serde(default, skip_serializing_if = "Option::is_none")]
        answer: Option<SessionDescription>,
    },
    /// ICE candidate received from a remote peer
    IceCandidateReceived {
        /// Originating peer
        from_id: String,
        /// Candidate, absent at end of gathering
        candidate: Option<IceCandidate>,
    },
    /// Relay-wide request to drop every peer connection in the room
    CloseAllPeerConnections,
    /// The relay closed the connection
    Disconnect,
}

/// Outbound commands emitted to the relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
#[serde(rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum SignalingCommand {
    /// Ask the relay to fan out call instructions to every participant
    CallAll,
    /// Ask the relay to fan out call instructions to the listed ids
    CallIds(Vec<String>),
    /// Send an offer to a peer
    CallPeer {
        /// Target peer
        to_id: String,
        /// Offer description
        offer: SessionDescription,
    },
    /// Send an answer to a peer, or decline its call
    MakePeerCallAnswer {
        /// Target peer
        to_id: String,
        /// Answer description; omitted to decline the call
        #[serde(default, skip_serializing_if = "Option::is_none")]
        answer: Option<SessionDescription>,
    },
    /// Send an ICE candidate to a peer
    SendIceCandidate {
        /// Target peer
        to_id: String,
        /// Discovered candidate
        candidate: IceCandidate,
    },
    /// Ask the relay to broadcast [`SignalingEvent::CloseAllPeerConnections`]
    CloseAllRoomPeerConnections,
}
