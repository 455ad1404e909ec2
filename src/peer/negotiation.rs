//! Offer/answer/ICE negotiation engine
//!
//! Drives one small state machine per remote peer, asymmetric between the
//! two roles. The offerer path runs on a local call command or an inbound
//! call instruction; the answerer path runs on an inbound offer. Glare is
//! resolved by first-offer-wins: a call instruction naming a peer that
//! already has an entry is ignored outright.

use crate::peer::registry::{NegotiationState, PeerConnectionRegistry};
use crate::peer::transport::Role;
use crate::signaling::channel::CommandSender;
use crate::signaling::protocol::{IceCandidate, SessionDescription, SignalingCommand};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::{debug, warn};

/// Per-peer negotiation protocol over the shared registry
pub struct NegotiationEngine {
    registry: Arc<PeerConnectionRegistry>,
}

impl NegotiationEngine {
    /// Create an engine over the given registry
    pub fn new(registry: Arc<PeerConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Run the offerer path for every listed id
    ///
    /// The local id and peers that already have an entry are skipped.
    /// Failures are logged per peer and do not stop the remaining calls.
    pub async fn make_calls(&self, ids: &[String], local_id: Option<&str>, sender: &CommandSender) {
        for id in ids {
            if Some(id.as_str()) == local_id {
                continue;
            }
            if let Err(e) = self.call_peer(id, sender).await {
                warn!("Failed to call peer {}: {}", id, e);
            }
        }
    }

    /// Offerer path: create and send an offer to one peer
    ///
    /// A no-op when an entry for the peer already exists (glare avoidance).
    pub async fn call_peer(&self, remote_id: &str, sender: &CommandSender) -> Result<()> {
        let (entry, created) = self
            .registry
            .get_or_create(remote_id, Role::Offerer, sender)
            .await?;
        if !created {
            debug!(
                "Ignoring call instruction for {}: negotiation already in progress",
                remote_id
            );
            return Ok(());
        }

        let transport = entry.transport();
        let offer = transport
            .create_offer()
            .await
            .map_err(|e| Error::negotiation(remote_id, e))?;
        transport
            .set_local_description(offer.clone())
            .await
            .map_err(|e| Error::negotiation(remote_id, e))?;

        entry.set_state(NegotiationState::OfferSent).await;
        sender.send(SignalingCommand::CallPeer {
            to_id: remote_id.to_string(),
            offer,
        });

        Ok(())
    }

    /// Answerer path: apply an inbound offer and reply with an answer
    pub async fn handle_peer_call(
        &self,
        from_id: &str,
        offer: SessionDescription,
        sender: &CommandSender,
    ) -> Result<()> {
        let (entry, _created) = self
            .registry
            .get_or_create(from_id, Role::Answerer, sender)
            .await?;

        let transport = entry.transport();
        transport
            .set_remote_description(offer)
            .await
            .map_err(|e| Error::negotiation(from_id, e))?;
        let answer = transport
            .create_answer()
            .await
            .map_err(|e| Error::negotiation(from_id, e))?;
        transport
            .set_local_description(answer.clone())
            .await
            .map_err(|e| Error::negotiation(from_id, e))?;

        entry.set_state(NegotiationState::Connected).await;
        sender.send(SignalingCommand::MakePeerCallAnswer {
            to_id: from_id.to_string(),
            answer: Some(answer),
        });

        Ok(())
    }

    /// Complete the offerer path with the peer's answer
    ///
    /// Returns whether the answer was applied; an answer from an unknown
    /// peer is dropped and reported as `false`.
    pub async fn handle_peer_call_answer(
        &self,
        from_id: &str,
        answer: SessionDescription,
    ) -> Result<bool> {
        let Some(entry) = self.registry.get(from_id).await else {
            warn!("Dropping answer from unknown peer {}", from_id);
            return Ok(false);
        };

        entry
            .transport()
            .set_remote_description(answer)
            .await
            .map_err(|e| Error::negotiation(from_id, e))?;
        entry.set_state(NegotiationState::Connected).await;

        Ok(true)
    }

    /// Apply an inbound ICE candidate
    ///
    /// Candidates for unknown peers are dropped, not buffered: the relay
    /// guarantees per-peer ordering, so an offer or answer always precedes
    /// its candidates.
    pub async fn handle_ice_candidate(
        &self,
        from_id: &str,
        candidate: Option<IceCandidate>,
    ) -> Result<()> {
        let Some(candidate) = candidate else {
            return Ok(());
        };
        let Some(entry) = self.registry.get(from_id).await else {
            debug!("Dropping ICE candidate for unknown peer {}", from_id);
            return Ok(());
        };

        entry
            .transport()
            .add_ice_candidate(candidate)
            .await
            .map_err(|e| Error::negotiation(from_id, e))
    }

    /// Quiesce every entry's candidate callback without removing entries
    ///
    /// Tearing down the transports afterwards is up to the application;
    /// entries are only dropped on session close.
    pub async fn hang_up_all(&self) {
        self.registry.quiesce_all().await;
    }
}
