//! Relay channel abstraction
//!
//! The rendezvous transport is an external collaborator. The session only
//! requires a connected duplex channel: a join request/acknowledgement
//! exchange, a clonable command sender, and a stream of inbound events.

use crate::signaling::protocol::{JoinRoomAck, JoinRoomRequest, SignalingCommand, SignalingEvent};
use crate::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

/// Clonable handle for emitting commands to the relay
///
/// Sends are fire-and-forget: once the channel is torn down they become
/// no-ops, so in-flight negotiation tasks cannot emit relay traffic after
/// the session closed.
#[derive(Clone)]
pub struct CommandSender {
    tx: mpsc::UnboundedSender<SignalingCommand>,
}

impl CommandSender {
    /// Wrap an outbound command queue
    pub fn new(tx: mpsc::UnboundedSender<SignalingCommand>) -> Self {
        Self { tx }
    }

    /// Emit a command to the relay
    ///
    /// Returns `false` when the channel is already closed and the command
    /// was discarded.
    pub fn send(&self, command: SignalingCommand) -> bool {
        match self.tx.send(command) {
            Ok(()) => true,
            Err(mpsc::error::SendError(command)) => {
                debug!("Channel closed, dropping outbound command: {:?}", command);
                false
            }
        }
    }
}

/// A connected relay channel
///
/// Produced by a [`ChannelFactory`]; the transport-level connect has already
/// succeeded by the time the session sees one of these.
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    /// Send the join request and wait for the relay's acknowledgement
    async fn join_room(&mut self, request: JoinRoomRequest) -> Result<JoinRoomAck>;

    /// Clonable handle for emitting commands
    fn sender(&self) -> CommandSender;

    /// Take the inbound event receiver
    ///
    /// Yields `None` after the first call; the session owns the receiver for
    /// the lifetime of the connection.
    fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<SignalingEvent>>;

    /// Close the channel
    ///
    /// Idempotent. After this call the event receiver terminates and every
    /// [`CommandSender`] becomes inert.
    async fn close(&mut self);
}

/// Factory opening relay channels
///
/// Owns transport-level connect, including the configured timeout. The
/// WebSocket implementation lives in [`crate::signaling::ws`]; tests
/// substitute an in-memory channel.
#[async_trait]
pub trait ChannelFactory: Send + Sync {
    /// Open a channel to the configured relay
    ///
    /// # Errors
    ///
    /// [`crate::Error::Connection`] on transport failure,
    /// [`crate::Error::ConnectionTimeout`] when the deadline elapses.
    async fn connect(
        &self,
        config: &crate::config::SignalingServerConfiguration,
    ) -> Result<Box<dyn SignalingChannel>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signaling::protocol::SignalingCommand;

    #[test]
    fn test_sender_reports_closed_channel() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sender = CommandSender::new(tx);

        assert!(sender.send(SignalingCommand::CallAll));

        drop(rx);
        assert!(!sender.send(SignalingCommand::CallAll));
    }
}
