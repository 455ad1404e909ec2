//! Session lifecycle and application-facing event surface

pub mod callbacks;
#[allow(clippy::module_inception)]
pub mod session;

pub use callbacks::{
    AddRemoteStreamCallback, CallAcceptor, CallRejectedCallback, ClientConnectedCallback,
    ClientDisconnectCallback, ConnectionCallback, ConnectionErrorCallback,
    RoomClientsChangedCallback,
};
pub use session::SignalingSession;
