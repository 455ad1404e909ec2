//! Room membership tracking
//!
//! Holds the latest roster announced by the relay. The per-client
//! `is_connected` flag is never cached: it is derived from the registry on
//! every query, so registry mutations show up on the next snapshot.

use crate::peer::registry::PeerConnectionRegistry;
use crate::signaling::protocol::{ClientInfo, RoomClient};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Current roster of the joined room
pub struct RoomMembershipTracker {
    registry: Arc<PeerConnectionRegistry>,
    clients: RwLock<Vec<ClientInfo>>,
    names_by_id: RwLock<HashMap<String, String>>,
}

impl RoomMembershipTracker {
    /// Create an empty tracker deriving connected flags from `registry`
    pub fn new(registry: Arc<PeerConnectionRegistry>) -> Self {
        Self {
            registry,
            clients: RwLock::new(Vec::new()),
            names_by_id: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the roster wholesale
    ///
    /// Returns the ids of registered peers that are no longer present, so
    /// the session can prune their connection entries.
    pub async fn replace(&self, clients: Vec<ClientInfo>) -> Vec<String> {
        debug!("Replacing roster with {} clients", clients.len());

        let mut names = HashMap::with_capacity(clients.len());
        for client in &clients {
            names.insert(client.id.clone(), client.name.clone());
        }

        let departed = {
            let mut departed = self.registry.registered_ids().await;
            departed.retain(|id| !names.contains_key(id));
            departed
        };

        *self.names_by_id.write().await = names;
        *self.clients.write().await = clients;

        departed
    }

    /// Roster snapshot with connected flags recomputed on demand
    pub async fn snapshot(&self, local_id: Option<&str>) -> Vec<RoomClient> {
        let clients = self.clients.read().await;
        let mut roster = Vec::with_capacity(clients.len());
        for client in clients.iter() {
            roster.push(RoomClient {
                id: client.id.clone(),
                name: client.name.clone(),
                is_connected: self.registry.has(&client.id).await
                    || Some(client.id.as_str()) == local_id,
            });
        }
        roster
    }

    /// A single roster entry, if the id is present
    pub async fn get(&self, id: &str, local_id: Option<&str>) -> Option<RoomClient> {
        let clients = self.clients.read().await;
        let client = clients.iter().find(|client| client.id == id)?;
        Some(RoomClient {
            id: client.id.clone(),
            name: client.name.clone(),
            is_connected: self.registry.has(&client.id).await
                || Some(client.id.as_str()) == local_id,
        })
    }

    /// Display name from the latest roster
    pub async fn name_for(&self, id: &str) -> Option<String> {
        self.names_by_id.read().await.get(id).cloned()
    }

    /// Whether the roster is empty
    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }

    /// Drop all roster state
    pub async fn clear(&self) {
        self.clients.write().await.clear();
        self.names_by_id.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::transport::testing::MockTransportFactory;
    use crate::peer::transport::Role;
    use crate::signaling::channel::CommandSender;
    use tokio::sync::mpsc;

    fn client(id: &str, name: &str) -> ClientInfo {
        ClientInfo {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    fn tracker() -> (RoomMembershipTracker, Arc<PeerConnectionRegistry>, CommandSender) {
        let registry = Arc::new(PeerConnectionRegistry::new(
            Arc::new(MockTransportFactory::default()),
            None,
        ));
        let (tx, _rx) = mpsc::unbounded_channel();
        (
            RoomMembershipTracker::new(registry.clone()),
            registry,
            CommandSender::new(tx),
        )
    }

    #[tokio::test]
    async fn test_connected_flag_tracks_registry_and_local_id() {
        let (tracker, registry, sender) = tracker();

        tracker
            .replace(vec![client("me", "Me"), client("b", "Bob"), client("c", "Carol")])
            .await;
        registry
            .get_or_create("b", Role::Offerer, &sender)
            .await
            .unwrap();

        let roster = tracker.snapshot(Some("me")).await;
        let by_id: std::collections::HashMap<_, _> =
            roster.iter().map(|c| (c.id.as_str(), c.is_connected)).collect();

        assert_eq!(by_id["me"], true);
        assert_eq!(by_id["b"], true);
        assert_eq!(by_id["c"], false);
    }

    #[tokio::test]
    async fn test_snapshot_reflects_registry_mutation_without_replace() {
        let (tracker, registry, sender) = tracker();

        tracker.replace(vec![client("b", "Bob")]).await;
        assert!(!tracker.snapshot(None).await[0].is_connected);

        registry
            .get_or_create("b", Role::Offerer, &sender)
            .await
            .unwrap();
        assert!(tracker.snapshot(None).await[0].is_connected);
    }

    #[tokio::test]
    async fn test_replace_reports_departed_registered_peers() {
        let (tracker, registry, sender) = tracker();

        tracker.replace(vec![client("b", "Bob"), client("c", "Carol")]).await;
        registry
            .get_or_create("b", Role::Offerer, &sender)
            .await
            .unwrap();
        registry
            .get_or_create("c", Role::Offerer, &sender)
            .await
            .unwrap();

        let departed = tracker.replace(vec![client("c", "Carol")]).await;
        assert_eq!(departed, vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_name_lookup_follows_latest_roster() {
        let (tracker, _registry, _sender) = tracker();

        tracker.replace(vec![client("b", "Bob")]).await;
        assert_eq!(tracker.name_for("b").await.as_deref(), Some("Bob"));

        tracker.replace(vec![client("b", "Bobby")]).await;
        assert_eq!(tracker.name_for("b").await.as_deref(), Some("Bobby"));

        tracker.clear().await;
        assert_eq!(tracker.name_for("b").await, None);
        assert!(tracker.is_empty().await);
    }
}
