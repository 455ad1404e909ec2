//! Peer connection registry
//!
//! Owns the mapping from remote participant id to its peer transport.
//! Creation is lazy and idempotent: a second `get_or_create` for the same id
//! returns the existing entry unchanged, which is what prevents duplicate
//! negotiation when both sides try to call each other at once.

use crate::peer::transport::{MediaStream, PeerTransport, PeerTransportFactory, Role};
use crate::signaling::channel::CommandSender;
use crate::signaling::protocol::SignalingCommand;
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Hook invoked when a registered transport delivers remote media
pub type RemoteMediaHook = Arc<dyn Fn(String, Arc<dyn MediaStream>) + Send + Sync>;

/// Per-peer negotiation progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    /// Entry exists but no description has been exchanged
    Idle,
    /// Local offer sent, waiting for the answer
    OfferSent,
    /// Description exchange completed
    Connected,
}

/// One registered peer connection
pub struct PeerEntry {
    remote_id: String,
    role: Role,
    transport: Arc<dyn PeerTransport>,
    state: RwLock<NegotiationState>,
}

impl PeerEntry {
    /// Remote participant id
    pub fn remote_id(&self) -> &str {
        &self.remote_id
    }

    /// Negotiation role of the local side
    pub fn role(&self) -> Role {
        self.role
    }

    /// Underlying peer transport
    pub fn transport(&self) -> &Arc<dyn PeerTransport> {
        &self.transport
    }

    /// Current negotiation state
    pub async fn state(&self) -> NegotiationState {
        *self.state.read().await
    }

    pub(crate) async fn set_state(&self, new_state: NegotiationState) {
        let mut state = self.state.write().await;
        if *state != new_state {
            debug!(
                "Peer {} negotiation state: {:?} -> {:?}",
                self.remote_id, *state, new_state
            );
            *state = new_state;
        }
    }

    /// Detach the candidate callback so no further candidates reach the relay
    pub(crate) fn quiesce(&self) {
        self.transport.set_on_ice_candidate(None);
    }
}

/// Registry of peer connections for one session
pub struct PeerConnectionRegistry {
    factory: Arc<dyn PeerTransportFactory>,
    entries: RwLock<HashMap<String, Arc<PeerEntry>>>,
    media_hook: Option<RemoteMediaHook>,
}

impl PeerConnectionRegistry {
    /// Create an empty registry backed by the given transport factory
    ///
    /// `media_hook`, when present, is wired to the remote-media callback of
    /// every transport the registry creates.
    pub fn new(factory: Arc<dyn PeerTransportFactory>, media_hook: Option<RemoteMediaHook>) -> Self {
        Self {
            factory,
            entries: RwLock::new(HashMap::new()),
            media_hook,
        }
    }

    /// Look up or create the entry for a remote peer
    ///
    /// Returns the entry and whether it was created by this call. An
    /// existing entry is returned unchanged, whatever role is requested.
    /// On creation the transport's candidate callback is wired to emit
    /// [`SignalingCommand::SendIceCandidate`] through `sender`.
    pub async fn get_or_create(
        &self,
        remote_id: &str,
        role: Role,
        sender: &CommandSender,
    ) -> Result<(Arc<PeerEntry>, bool)> {
        let mut entries = self.entries.write().await;

        if let Some(entry) = entries.get(remote_id) {
            return Ok((entry.clone(), false));
        }

        debug!("Creating peer connection for {} as {:?}", remote_id, role);
        let transport = self.factory.create(remote_id, role)?;

        let to_id = remote_id.to_string();
        let sender = sender.clone();
        transport.set_on_ice_candidate(Some(Arc::new(move |candidate| {
            // None marks the end of gathering; nothing to relay
            if let Some(candidate) = candidate {
                sender.send(SignalingCommand::SendIceCandidate {
                    to_id: to_id.clone(),
                    candidate,
                });
            }
        })));

        if let Some(hook) = &self.media_hook {
            let hook = hook.clone();
            let from_id = remote_id.to_string();
            transport.set_on_remote_media(Some(Arc::new(move |stream| {
                hook(from_id.clone(), stream);
            })));
        }

        let entry = Arc::new(PeerEntry {
            remote_id: remote_id.to_string(),
            role,
            transport,
            state: RwLock::new(NegotiationState::Idle),
        });
        entries.insert(remote_id.to_string(), entry.clone());

        Ok((entry, true))
    }

    /// Whether an entry exists for the given id
    pub async fn has(&self, remote_id: &str) -> bool {
        self.entries.read().await.contains_key(remote_id)
    }

    /// Look up an existing entry
    pub async fn get(&self, remote_id: &str) -> Option<Arc<PeerEntry>> {
        self.entries.read().await.get(remote_id).cloned()
    }

    /// All current entries
    pub async fn all_entries(&self) -> Vec<Arc<PeerEntry>> {
        self.entries.read().await.values().cloned().collect()
    }

    /// Ids of all registered peers
    pub async fn registered_ids(&self) -> Vec<String> {
        self.entries.read().await.keys().cloned().collect()
    }

    /// Detach and return an entry
    ///
    /// Closing the underlying transport is the caller's responsibility.
    pub async fn remove(&self, remote_id: &str) -> Option<Arc<PeerEntry>> {
        let removed = self.entries.write().await.remove(remote_id);
        if let Some(entry) = &removed {
            debug!("Removed peer connection for {}", remote_id);
            entry.quiesce();
            entry.transport.set_on_remote_media(None);
        }
        removed
    }

    /// Whether the registry holds no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Number of registered peers
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Detach every entry's candidate callback without removing the entries
    pub async fn quiesce_all(&self) {
        for entry in self.entries.read().await.values() {
            entry.quiesce();
        }
    }

    /// Quiesce and drop every entry
    pub async fn clear(&self) -> Vec<Arc<PeerEntry>> {
        let mut entries = self.entries.write().await;
        let drained: Vec<_> = entries.drain().map(|(_, entry)| entry).collect();
        for entry in &drained {
            entry.quiesce();
            entry.transport.set_on_remote_media(None);
        }
        drained
    }
}
