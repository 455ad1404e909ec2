//! Signaling protocol, relay channel abstraction, and WebSocket channel

pub mod channel;
pub mod protocol;
pub mod ws;

pub use channel::{ChannelFactory, CommandSender, SignalingChannel};
pub use protocol::{
    ClientInfo, IceCandidate, JoinRoomAck, JoinRoomRequest, RoomClient, SdpType,
    SessionDescription, SignalingCommand, SignalingEvent,
};
pub use ws::WsChannelFactory;
