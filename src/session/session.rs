//! Signaling session: public surface and event dispatch
//!
//! One `SignalingSession` owns the relay channel lifecycle, routes inbound
//! relay events to the negotiation engine and roster tracker, and raises the
//! application callbacks. Inbound events are processed strictly one at a
//! time by a single dispatch task, which gives per-peer sequential ordering
//! without extra locking.

use crate::config::SignalingServerConfiguration;
use crate::peer::negotiation::NegotiationEngine;
use crate::peer::registry::PeerConnectionRegistry;
use crate::peer::transport::{MediaStream, PeerTransportFactory};
use crate::room::roster::RoomMembershipTracker;
use crate::session::callbacks::SessionCallbacks;
use crate::signaling::channel::{ChannelFactory, CommandSender, SignalingChannel};
use crate::signaling::protocol::{
    ClientInfo, JoinRoomRequest, RoomClient, SignalingCommand, SignalingEvent,
};
use crate::signaling::ws::WsChannelFactory;
use crate::{Error, Result};
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A signaling session for one named room
///
/// Created disconnected; [`connect`](Self::connect) joins the room and
/// starts event dispatch, [`close`](Self::close) tears everything down.
/// There is no automatic reconnection: after a relay disconnect the
/// application calls `connect` again.
pub struct SignalingSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SignalingServerConfiguration,
    channel_factory: Box<dyn ChannelFactory>,
    registry: Arc<PeerConnectionRegistry>,
    engine: NegotiationEngine,
    roster: RoomMembershipTracker,
    callbacks: SessionCallbacks,
    local_id: RwLock<Option<String>>,
    sender: RwLock<Option<CommandSender>>,
    channel: Mutex<Option<Box<dyn SignalingChannel>>>,
    dispatch_task: Mutex<Option<JoinHandle<()>>>,
}

impl SignalingSession {
    /// Create a disconnected session
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when the configuration is invalid.
    pub fn new(
        config: SignalingServerConfiguration,
        channel_factory: Box<dyn ChannelFactory>,
        transport_factory: Arc<dyn PeerTransportFactory>,
    ) -> Result<Self> {
        config.validate()?;

        let inner = Arc::new_cyclic(|weak: &Weak<SessionInner>| {
            let media_weak = weak.clone();
            let registry = Arc::new(PeerConnectionRegistry::new(
                transport_factory,
                Some(Arc::new(move |id, stream| {
                    if let Some(inner) = media_weak.upgrade() {
                        tokio::spawn(async move {
                            inner.emit_add_remote_stream(id, stream).await;
                        });
                    }
                })),
            ));

            SessionInner {
                config,
                channel_factory,
                engine: NegotiationEngine::new(registry.clone()),
                roster: RoomMembershipTracker::new(registry.clone()),
                registry,
                callbacks: SessionCallbacks::default(),
                local_id: RwLock::new(None),
                sender: RwLock::new(None),
                channel: Mutex::new(None),
                dispatch_task: Mutex::new(None),
            }
        });

        Ok(Self { inner })
    }

    /// Create a disconnected session over the WebSocket relay channel
    pub fn with_websocket(
        config: SignalingServerConfiguration,
        transport_factory: Arc<dyn PeerTransportFactory>,
    ) -> Result<Self> {
        Self::new(config, Box::new(WsChannelFactory), transport_factory)
    }

    /// Connect to the relay and join the configured room
    ///
    /// On success the connection-open callback has fired and event dispatch
    /// is running.
    ///
    /// # Errors
    ///
    /// - [`Error::Signaling`] when the session is already connected
    /// - [`Error::Connection`] / [`Error::ConnectionTimeout`] on transport
    ///   failure
    /// - [`Error::Authentication`] when the relay rejects the join; the
    ///   channel is closed and the connection-error callback has fired
    pub async fn connect(&self) -> Result<()> {
        let inner = &self.inner;
        let mut channel_slot = inner.channel.lock().await;
        if channel_slot.is_some() {
            return Err(Error::Signaling("Session already connected".to_string()));
        }

        let mut channel = inner.channel_factory.connect(&inner.config).await?;

        let request = JoinRoomRequest {
            name: inner.config.client_name.clone(),
            room: inner.config.room.clone(),
            password: inner.config.password.clone(),
        };
        let ack = channel.join_room(request).await?;

        if !ack.joined {
            info!("Join rejected for room {}", inner.config.room);
            channel.close().await;
            inner
                .callbacks
                .emit_connection_error("Invalid password".to_string())
                .await;
            return Err(Error::Authentication("Invalid password".to_string()));
        }

        let events = channel
            .take_events()
            .ok_or_else(|| Error::Signaling("Channel event stream unavailable".to_string()))?;

        info!(
            "Joined room {} as {:?}",
            inner.config.room, ack.client_id
        );
        *inner.local_id.write().await = ack.client_id;
        *inner.sender.write().await = Some(channel.sender());
        *channel_slot = Some(channel);
        drop(channel_slot);

        let dispatch_inner = inner.clone();
        let task = tokio::spawn(async move {
            dispatch_inner.dispatch_loop(events).await;
        });
        *inner.dispatch_task.lock().await = Some(task);

        inner.callbacks.emit_connection_open().await;

        Ok(())
    }

    /// Close the session
    ///
    /// Idempotent. Strips candidate callbacks, drops every peer entry,
    /// clears the roster and local id, closes the channel, and fires the
    /// connection-close callback once per open connection.
    pub async fn close(&self) {
        self.inner.teardown(false).await;
    }

    /// Ask the relay to fan out call instructions to every participant
    pub async fn call_all(&self) -> Result<()> {
        self.inner.send(SignalingCommand::CallAll).await
    }

    /// Ask the relay to fan out call instructions to the listed ids
    pub async fn call_ids(&self, ids: Vec<String>) -> Result<()> {
        self.inner.send(SignalingCommand::CallIds(ids)).await
    }

    /// Stop forwarding ICE candidates for every current peer connection
    ///
    /// Entries stay registered; tearing down the transports is up to the
    /// application. Dropping everything happens on [`close`](Self::close).
    pub async fn hang_up_all(&self) {
        self.inner.engine.hang_up_all().await;
    }

    /// Ask the relay to broadcast a close-all-peer-connections request to
    /// the whole room, including back to this client
    pub async fn close_all_room_peer_connections(&self) -> Result<()> {
        self.inner
            .send(SignalingCommand::CloseAllRoomPeerConnections)
            .await
    }

    /// Whether the relay channel is currently open
    pub async fn is_connected(&self) -> bool {
        self.inner.sender.read().await.is_some()
    }

    /// Whether at least one peer connection entry exists
    pub async fn is_rtc_connected(&self) -> bool {
        !self.inner.registry.is_empty().await
    }

    /// Local participant id assigned by the relay, while joined
    pub async fn local_id(&self) -> Option<String> {
        self.inner.local_id.read().await.clone()
    }

    /// Roster snapshot with connected flags recomputed on demand
    pub async fn room_clients(&self) -> Vec<RoomClient> {
        let local_id = self.inner.local_id.read().await.clone();
        self.inner.roster.snapshot(local_id.as_deref()).await
    }

    /// A single roster entry, if present
    pub async fn room_client(&self, id: &str) -> Option<RoomClient> {
        let local_id = self.inner.local_id.read().await.clone();
        self.inner.roster.get(id, local_id.as_deref()).await
    }

    /// Ids of peers with a connection entry
    pub async fn connected_room_client_ids(&self) -> Vec<String> {
        self.inner.registry.registered_ids().await
    }

    /// Display name of a room client from the latest roster
    pub async fn client_name(&self, id: &str) -> Option<String> {
        self.inner.roster.name_for(id).await
    }

    /// Re-fire the roster-changed callback with a fresh snapshot
    pub async fn update_room_clients(&self) {
        self.inner.emit_room_clients_changed().await;
    }

    /// Register the connection-open callback
    pub async fn on_connection_open<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner
            .callbacks
            .set_on_connection_open(Arc::new(callback))
            .await;
    }

    /// Register the connection-close callback
    pub async fn on_connection_close<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner
            .callbacks
            .set_on_connection_close(Arc::new(callback))
            .await;
    }

    /// Register the connection-error callback
    pub async fn on_connection_error<F>(&self, callback: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.inner
            .callbacks
            .set_on_connection_error(Arc::new(callback))
            .await;
    }

    /// Register the roster-changed callback
    pub async fn on_room_clients_changed<F>(&self, callback: F)
    where
        F: Fn(Vec<RoomClient>) + Send + Sync + 'static,
    {
        self.inner
            .callbacks
            .set_on_room_clients_changed(Arc::new(callback))
            .await;
    }

    /// Register the remote-media callback
    pub async fn on_add_remote_stream<F>(&self, callback: F)
    where
        F: Fn(String, String, Arc<dyn MediaStream>) + Send + Sync + 'static,
    {
        self.inner
            .callbacks
            .set_on_add_remote_stream(Arc::new(callback))
            .await;
    }

    /// Register the client-connected callback, fired when a peer
    /// connection completes its description exchange
    pub async fn on_client_connected<F>(&self, callback: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.inner
            .callbacks
            .set_on_client_connected(Arc::new(callback))
            .await;
    }

    /// Register the client-disconnect callback
    pub async fn on_client_disconnect<F>(&self, callback: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.inner
            .callbacks
            .set_on_client_disconnect(Arc::new(callback))
            .await;
    }

    /// Register the call-rejected callback, fired when a called peer
    /// declines with an answerless reply
    pub async fn on_call_rejected<F>(&self, callback: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.inner
            .callbacks
            .set_on_call_rejected(Arc::new(callback))
            .await;
    }

    /// Register the call acceptor consulted before answering inbound calls
    ///
    /// Returning `false` declines the call: no peer connection is created
    /// and the caller receives an answerless reply. Without an acceptor
    /// every call is accepted.
    pub async fn set_call_acceptor<F>(&self, acceptor: F)
    where
        F: Fn(String) -> bool + Send + Sync + 'static,
    {
        self.inner
            .callbacks
            .set_call_acceptor(Arc::new(acceptor))
            .await;
    }
}

impl SessionInner {
    /// Process inbound relay events one at a time until the stream ends
    async fn dispatch_loop(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<SignalingEvent>) {
        while let Some(event) = events.recv().await {
            debug!("Dispatching relay event: {:?}", event);
            match event {
                SignalingEvent::RoomClients(clients) => {
                    self.handle_room_clients(clients).await;
                }
                SignalingEvent::MakePeerCall(ids) => {
                    let Some(sender) = self.current_sender().await else {
                        continue;
                    };
                    let local_id = self.local_id.read().await.clone();
                    self.engine
                        .make_calls(&ids, local_id.as_deref(), &sender)
                        .await;
                }
                SignalingEvent::PeerCallReceived { from_id, offer } => {
                    let Some(sender) = self.current_sender().await else {
                        continue;
                    };
                    if !self.callbacks.accepts_call(&from_id).await {
                        info!("Declining call from {}", from_id);
                        sender.send(SignalingCommand::MakePeerCallAnswer {
                            to_id: from_id,
                            answer: None,
                        });
                        continue;
                    }
                    match self.engine.handle_peer_call(&from_id, offer, &sender).await {
                        Ok(()) => self.callbacks.emit_client_connected(from_id).await,
                        Err(e) => warn!("Failed to answer call from {}: {}", from_id, e),
                    }
                }
                SignalingEvent::PeerCallAnswerReceived { from_id, answer } => {
                    let Some(answer) = answer else {
                        // Answerless reply: the peer declined our call
                        if self.registry.remove(&from_id).await.is_some() {
                            info!("Call to {} was declined", from_id);
                            self.callbacks.emit_call_rejected(from_id).await;
                        }
                        continue;
                    };
                    match self.engine.handle_peer_call_answer(&from_id, answer).await {
                        Ok(true) => self.callbacks.emit_client_connected(from_id).await,
                        Ok(false) => {}
                        Err(e) => warn!("Failed to apply answer from {}: {}", from_id, e),
                    }
                }
                SignalingEvent::IceCandidateReceived { from_id, candidate } => {
                    if let Err(e) = self.engine.handle_ice_candidate(&from_id, candidate).await {
                        warn!("Failed to apply ICE candidate from {}: {}", from_id, e);
                    }
                }
                SignalingEvent::CloseAllPeerConnections => {
                    self.drop_all_peer_connections().await;
                }
                SignalingEvent::Disconnect => {
                    info!("Relay requested disconnect");
                    break;
                }
            }
        }

        // Relay-initiated teardown: the stream ended or asked us to leave
        self.teardown(true).await;
    }

    /// Roster replace: prune entries for departed peers, then notify
    async fn handle_room_clients(&self, clients: Vec<ClientInfo>) {
        let departed = self.roster.replace(clients).await;
        for id in departed {
            if self.registry.remove(&id).await.is_some() {
                info!("Peer {} left the room", id);
                self.callbacks.emit_client_disconnect(id).await;
            }
        }
        self.emit_room_clients_changed().await;
    }

    /// Drop every peer entry and report each as disconnected
    async fn drop_all_peer_connections(&self) {
        let drained = self.registry.clear().await;
        for entry in drained {
            self.callbacks
                .emit_client_disconnect(entry.remote_id().to_string())
                .await;
        }
        self.emit_room_clients_changed().await;
    }

    async fn emit_room_clients_changed(&self) {
        let local_id = self.local_id.read().await.clone();
        let roster = self.roster.snapshot(local_id.as_deref()).await;
        self.callbacks.emit_room_clients_changed(roster).await;
    }

    async fn emit_add_remote_stream(&self, id: String, stream: Arc<dyn MediaStream>) {
        let name = self.roster.name_for(&id).await.unwrap_or_default();
        self.callbacks.emit_add_remote_stream(id, name, stream).await;
    }

    async fn current_sender(&self) -> Option<CommandSender> {
        self.sender.read().await.clone()
    }

    /// Emit a command, failing when the session is not connected
    async fn send(&self, command: SignalingCommand) -> Result<()> {
        let sender = self
            .current_sender()
            .await
            .ok_or_else(|| Error::Signaling("Session is not connected".to_string()))?;
        if !sender.send(command) {
            return Err(Error::Connection("Relay channel closed".to_string()));
        }
        Ok(())
    }

    /// Tear the connection down; runs at most once per open connection
    async fn teardown(&self, from_dispatch: bool) {
        // The sender slot doubles as the teardown guard
        if self.sender.write().await.take().is_none() {
            return;
        }

        info!("Closing signaling session");

        self.registry.clear().await;
        self.roster.clear().await;
        *self.local_id.write().await = None;

        if let Some(mut channel) = self.channel.lock().await.take() {
            channel.close().await;
        }

        if let Some(task) = self.dispatch_task.lock().await.take() {
            if !from_dispatch {
                task.abort();
            }
        }

        self.callbacks.emit_connection_close().await;
    }
}
