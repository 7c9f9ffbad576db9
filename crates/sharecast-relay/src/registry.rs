//! Connection registry: maps connection ids to their outbound queues.

use std::collections::HashMap;
use std::sync::Arc;

use sharecast_common::ConnId;
use tokio::sync::{mpsc, RwLock};

use crate::protocol::ServerMessage;

/// Sending half of a connection's outbound queue. Unbounded, so relaying
/// never waits on a slow reader and never loses a message.
pub type ConnectionHandle = mpsc::UnboundedSender<ServerMessage>;

/// Thread-safe connection registry.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<RwLock<HashMap<ConnId, ConnectionHandle>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a handle under a freshly generated id.
    pub async fn register(&self, handle: ConnectionHandle) -> ConnId {
        let id = ConnId::new();
        self.connections.write().await.insert(id.clone(), handle);
        id
    }

    pub async fn resolve(&self, id: &ConnId) -> Option<ConnectionHandle> {
        self.connections.read().await.get(id).cloned()
    }

    /// Remove a connection. Returns false if it was not registered.
    pub async fn unregister(&self, id: &ConnId) -> bool {
        self.connections.write().await.remove(id).is_some()
    }

    /// Number of live connections.
    pub async fn count(&self) -> usize {
        self.connections.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_then_resolve() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = registry.register(tx).await;

        assert!(registry.resolve(&id).await.is_some());
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let a = registry.register(tx.clone()).await;
        let b = registry.register(tx).await;
        assert_ne!(a, b);
        assert_eq!(registry.count().await, 2);
    }

    #[tokio::test]
    async fn unregister_removes_handle_once() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = registry.register(tx).await;

        assert!(registry.unregister(&id).await);
        assert!(!registry.unregister(&id).await);
        assert!(registry.resolve(&id).await.is_none());
    }

    #[tokio::test]
    async fn unknown_id_is_unresolvable() {
        let registry = ConnectionRegistry::new();
        assert!(registry.resolve(&ConnId::from("ghost")).await.is_none());
    }
}
