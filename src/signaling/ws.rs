//! WebSocket implementation of the relay channel
//!
//! Messages are JSON envelopes (`{"event", "data", "id"}`); dedicated
//! sender and receiver tasks bridge the socket to the channel queues.

use crate::config::SignalingServerConfiguration;
use crate::signaling::channel::{ChannelFactory, CommandSender, SignalingChannel};
use crate::signaling::protocol::{JoinRoomAck, JoinRoomRequest, SignalingCommand, SignalingEvent};
use crate::{Error, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const JOIN_ROOM_EVENT: &str = "join-room";
const JOIN_ROOM_ACK_EVENT: &str = "join-room-ack";

// Bound on waiting for the Close frame to flush during teardown
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct JoinEnvelope<'a> {
    event: &'static str,
    data: &'a JoinRoomRequest,
    id: String,
}

#[derive(Serialize)]
struct CommandEnvelope {
    #[serde(flatten)]
    command: SignalingCommand,
    id: String,
}

/// Opens WebSocket relay channels with the configured connect timeout
#[derive(Debug, Default)]
pub struct WsChannelFactory;

#[async_trait]
impl ChannelFactory for WsChannelFactory {
    async fn connect(
        &self,
        config: &SignalingServerConfiguration,
    ) -> Result<Box<dyn SignalingChannel>> {
        info!("Connecting to signaling server: {}", config.url);

        let timeout = Duration::from_secs(config.connect_timeout_secs);
        let connect = tokio::time::timeout(timeout, connect_async(&config.url))
            .await
            .map_err(|_| Error::ConnectionTimeout(config.connect_timeout_secs))?;
        let (ws_stream, _) =
            connect.map_err(|e| Error::Connection(format!("Failed to connect: {}", e)))?;

        info!("Connected to signaling server");

        Ok(Box::new(WsSignalingChannel::start(ws_stream, timeout)))
    }
}

/// A connected WebSocket relay channel
pub struct WsSignalingChannel {
    cmd_tx: Option<mpsc::UnboundedSender<SignalingCommand>>,
    raw_tx: Option<mpsc::UnboundedSender<Message>>,
    events: Option<mpsc::UnboundedReceiver<SignalingEvent>>,
    pending_ack: Arc<Mutex<Option<oneshot::Sender<JoinRoomAck>>>>,
    sender_task: Option<JoinHandle<()>>,
    receiver_task: Option<JoinHandle<()>>,
    ack_timeout: Duration,
}

impl WsSignalingChannel {
    fn start(ws_stream: WsStream, ack_timeout: Duration) -> Self {
        let (write, read) = ws_stream.split();

        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let pending_ack: Arc<Mutex<Option<oneshot::Sender<JoinRoomAck>>>> =
            Arc::new(Mutex::new(None));

        let sender_task = tokio::spawn(Self::sender_task(write, raw_rx));
        tokio::spawn(Self::forward_task(cmd_rx, raw_tx.clone()));
        let receiver_task = tokio::spawn(Self::receiver_task(read, event_tx, pending_ack.clone()));

        Self {
            cmd_tx: Some(cmd_tx),
            raw_tx: Some(raw_tx),
            events: Some(event_rx),
            pending_ack,
            sender_task: Some(sender_task),
            receiver_task: Some(receiver_task),
            ack_timeout,
        }
    }

    /// Sender task: writes queued frames to the socket
    async fn sender_task(
        mut write: futures::stream::SplitSink<WsStream, Message>,
        mut raw_rx: mpsc::UnboundedReceiver<Message>,
    ) {
        while let Some(msg) = raw_rx.recv().await {
            let is_close = matches!(msg, Message::Close(_));
            if let Err(e) = write.send(msg).await {
                error!("Failed to send WebSocket message: {}", e);
                break;
            }
            if is_close {
                break;
            }
        }

        debug!("Sender task terminated");
    }

    /// Forward task: serializes commands into wire envelopes
    async fn forward_task(
        mut cmd_rx: mpsc::UnboundedReceiver<SignalingCommand>,
        raw_tx: mpsc::UnboundedSender<Message>,
    ) {
        while let Some(command) = cmd_rx.recv().await {
            let envelope = CommandEnvelope {
                command,
                id: uuid::Uuid::new_v4().to_string(),
            };
            match serde_json::to_string(&envelope) {
                Ok(json) => {
                    if raw_tx.send(Message::Text(json)).is_err() {
                        break;
                    }
                }
                Err(e) => error!("Failed to serialize outbound command: {}", e),
            }
        }

        debug!("Forward task terminated");
    }

    /// Receiver task: parses inbound frames and routes them
    async fn receiver_task(
        mut read: futures::stream::SplitStream<WsStream>,
        event_tx: mpsc::UnboundedSender<SignalingEvent>,
        pending_ack: Arc<Mutex<Option<oneshot::Sender<JoinRoomAck>>>>,
    ) {
        while let Some(msg_result) = read.next().await {
            match msg_result {
                Ok(Message::Text(text)) => {
                    Self::handle_frame(&text, &event_tx, &pending_ack).await;
                }
                Ok(Message::Close(_)) => {
                    info!("WebSocket connection closed by relay");
                    break;
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }

        debug!("Receiver task terminated");
    }

    async fn handle_frame(
        text: &str,
        event_tx: &mpsc::UnboundedSender<SignalingEvent>,
        pending_ack: &Arc<Mutex<Option<oneshot::Sender<JoinRoomAck>>>>,
    ) {
        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                warn!("Discarding malformed signaling frame: {}", e);
                return;
            }
        };

        if value.get("event").and_then(|e| e.as_str()) == Some(JOIN_ROOM_ACK_EVENT) {
            let ack: JoinRoomAck = match serde_json::from_value(value["data"].clone()) {
                Ok(ack) => ack,
                Err(e) => {
                    warn!("Discarding malformed join acknowledgement: {}", e);
                    return;
                }
            };
            if let Some(tx) = pending_ack.lock().await.take() {
                let _ = tx.send(ack);
            } else {
                warn!("Unsolicited join acknowledgement");
            }
            return;
        }

        match serde_json::from_value::<SignalingEvent>(value) {
            Ok(event) => {
                if event_tx.send(event).is_err() {
                    debug!("Event receiver dropped, discarding inbound event");
                }
            }
            Err(e) => warn!("Unknown signaling event: {}", e),
        }
    }
}

#[async_trait]
impl SignalingChannel for WsSignalingChannel {
    async fn join_room(&mut self, request: JoinRoomRequest) -> Result<JoinRoomAck> {
        let raw_tx = self
            .raw_tx
            .as_ref()
            .ok_or_else(|| Error::Signaling("Channel already closed".to_string()))?;

        let (ack_tx, ack_rx) = oneshot::channel();
        *self.pending_ack.lock().await = Some(ack_tx);

        let envelope = JoinEnvelope {
            event: JOIN_ROOM_EVENT,
            data: &request,
            id: uuid::Uuid::new_v4().to_string(),
        };
        let json = serde_json::to_string(&envelope)?;
        raw_tx
            .send(Message::Text(json))
            .map_err(|_| Error::Connection("Channel closed before join".to_string()))?;

        let ack = tokio::time::timeout(self.ack_timeout, ack_rx)
            .await
            .map_err(|_| Error::ConnectionTimeout(self.ack_timeout.as_secs()))?
            .map_err(|_| Error::Connection("Channel closed during join".to_string()))?;

        Ok(ack)
    }

    fn sender(&self) -> CommandSender {
        match &self.cmd_tx {
            Some(tx) => CommandSender::new(tx.clone()),
            None => {
                // Closed channel: hand out an inert sender
                let (tx, _rx) = mpsc::unbounded_channel();
                CommandSender::new(tx)
            }
        }
    }

    fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<SignalingEvent>> {
        self.events.take()
    }

    async fn close(&mut self) {
        if let Some(raw_tx) = self.raw_tx.take() {
            let _ = raw_tx.send(Message::Close(None));
        }
        self.cmd_tx = None;

        // The sender task exits right after writing the Close frame; wait
        // for it so the frame is flushed before teardown proceeds
        if let Some(task) = self.sender_task.take() {
            if tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, task).await.is_err() {
                warn!("Timed out waiting for the Close frame to flush");
            }
        }

        if let Some(task) = self.receiver_task.take() {
            task.abort();
        }
    }
}
