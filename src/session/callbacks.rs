//! Typed callback registration for session events
//!
//! Each event fires exactly once per occurrence; dispatch is a direct call
//! into the registered closure, with no internal queuing.

use crate::peer::transport::MediaStream;
use crate::signaling::protocol::RoomClient;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Callback for connection open/close events
pub type ConnectionCallback = Arc<dyn Fn() + Send + Sync>;

/// Callback for connection errors, with a human-readable message
pub type ConnectionErrorCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Callback for roster changes
pub type RoomClientsChangedCallback = Arc<dyn Fn(Vec<RoomClient>) + Send + Sync>;

/// Callback for remote media: peer id, peer name, opaque stream
pub type AddRemoteStreamCallback = Arc<dyn Fn(String, String, Arc<dyn MediaStream>) + Send + Sync>;

/// Callback for a peer connection completing negotiation
pub type ClientConnectedCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Callback for a peer's connection going away
pub type ClientDisconnectCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Callback for a peer declining a call
pub type CallRejectedCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Policy hook consulted before answering an inbound call
///
/// Returning `false` declines the call. With no acceptor registered every
/// call is accepted.
pub type CallAcceptor = Arc<dyn Fn(String) -> bool + Send + Sync>;

/// Callback handlers for session events
#[derive(Default)]
pub struct SessionCallbacks {
    on_connection_open: Mutex<Option<ConnectionCallback>>,
    on_connection_close: Mutex<Option<ConnectionCallback>>,
    on_connection_error: Mutex<Option<ConnectionErrorCallback>>,
    on_room_clients_changed: Mutex<Option<RoomClientsChangedCallback>>,
    on_add_remote_stream: Mutex<Option<AddRemoteStreamCallback>>,
    on_client_connected: Mutex<Option<ClientConnectedCallback>>,
    on_client_disconnect: Mutex<Option<ClientDisconnectCallback>>,
    on_call_rejected: Mutex<Option<CallRejectedCallback>>,
    call_acceptor: Mutex<Option<CallAcceptor>>,
}

impl SessionCallbacks {
    pub(crate) async fn set_on_connection_open(&self, callback: ConnectionCallback) {
        *self.on_connection_open.lock().await = Some(callback);
    }

    pub(crate) async fn set_on_connection_close(&self, callback: ConnectionCallback) {
        *self.on_connection_close.lock().await = Some(callback);
    }

    pub(crate) async fn set_on_connection_error(&self, callback: ConnectionErrorCallback) {
        *self.on_connection_error.lock().await = Some(callback);
    }

    pub(crate) async fn set_on_room_clients_changed(&self, callback: RoomClientsChangedCallback) {
        *self.on_room_clients_changed.lock().await = Some(callback);
    }

    pub(crate) async fn set_on_add_remote_stream(&self, callback: AddRemoteStreamCallback) {
        *self.on_add_remote_stream.lock().await = Some(callback);
    }

    pub(crate) async fn set_on_client_connected(&self, callback: ClientConnectedCallback) {
        *self.on_client_connected.lock().await = Some(callback);
    }

    pub(crate) async fn set_on_client_disconnect(&self, callback: ClientDisconnectCallback) {
        *self.on_client_disconnect.lock().await = Some(callback);
    }

    pub(crate) async fn set_on_call_rejected(&self, callback: CallRejectedCallback) {
        *self.on_call_rejected.lock().await = Some(callback);
    }

    pub(crate) async fn set_call_acceptor(&self, acceptor: CallAcceptor) {
        *self.call_acceptor.lock().await = Some(acceptor);
    }

    /// Consult the acceptor; calls are accepted when none is registered
    pub(crate) async fn accepts_call(&self, from_id: &str) -> bool {
        match self.call_acceptor.lock().await.as_ref() {
            Some(acceptor) => acceptor(from_id.to_string()),
            None => true,
        }
    }

    pub(crate) async fn emit_connection_open(&self) {
        if let Some(callback) = self.on_connection_open.lock().await.as_ref() {
            callback();
        }
    }

    pub(crate) async fn emit_connection_close(&self) {
        if let Some(callback) = self.on_connection_close.lock().await.as_ref() {
            callback();
        }
    }

    pub(crate) async fn emit_connection_error(&self, message: String) {
        if let Some(callback) = self.on_connection_error.lock().await.as_ref() {
            callback(message);
        }
    }

    pub(crate) async fn emit_room_clients_changed(&self, roster: Vec<RoomClient>) {
        if let Some(callback) = self.on_room_clients_changed.lock().await.as_ref() {
            callback(roster);
        }
    }

    pub(crate) async fn emit_add_remote_stream(
        &self,
        id: String,
        name: String,
        stream: Arc<dyn MediaStream>,
    ) {
        if let Some(callback) = self.on_add_remote_stream.lock().await.as_ref() {
            callback(id, name, stream);
        }
    }

    pub(crate) async fn emit_client_connected(&self, id: String) {
        if let Some(callback) = self.on_client_connected.lock().await.as_ref() {
            callback(id);
        }
    }

    pub(crate) async fn emit_client_disconnect(&self, id: String) {
        if let Some(callback) = self.on_client_disconnect.lock().await.as_ref() {
            callback(id);
        }
    }

    pub(crate) async fn emit_call_rejected(&self, id: String) {
        if let Some(callback) = self.on_call_rejected.lock().await.as_ref() {
            callback(id);
        }
    }
}
