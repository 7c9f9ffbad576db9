//! Broadcast dispatcher: resolves recipients and pushes messages onto
//! their outbound queues without waiting on them.

use sharecast_common::{ConnId, SessionId};
use tracing::debug;

use crate::coordinator::{Outbound, Recipients};
use crate::protocol::ServerMessage;
use crate::registry::ConnectionRegistry;
use crate::session::SessionStore;

#[derive(Clone)]
pub struct Dispatcher {
    registry: ConnectionRegistry,
    store: SessionStore,
}

impl Dispatcher {
    pub fn new(registry: ConnectionRegistry, store: SessionStore) -> Self {
        Self { registry, store }
    }

    /// Deliver effects in order. Returns how many messages were queued.
    pub async fn dispatch(&self, effects: Vec<Outbound>) -> usize {
        let mut delivered = 0;
        for Outbound { to, message } in effects {
            delivered += match to {
                Recipients::One(id) => usize::from(self.send_to_one(&id, message).await),
                Recipients::Many(ids) => self.send_to_each(&ids, &message).await,
            };
        }
        delivered
    }

    /// Send to every current participant of a session except `exclude`.
    pub async fn send_to_session(
        &self,
        session_id: &SessionId,
        exclude: Option<&ConnId>,
        message: &ServerMessage,
    ) -> usize {
        let participants: Vec<ConnId> = self
            .store
            .list_participants(session_id)
            .await
            .into_iter()
            .filter(|id| Some(id) != exclude)
            .collect();
        self.send_to_each(&participants, message).await
    }

    /// Send to each id in turn. Stale participants with no live
    /// connection are skipped.
    async fn send_to_each(&self, ids: &[ConnId], message: &ServerMessage) -> usize {
        let mut delivered = 0;
        for id in ids {
            if self.send_to_one(id, message.clone()).await {
                delivered += 1;
            }
        }
        delivered
    }

    /// Send to a single connection; dropped if it is gone.
    pub async fn send_to_one(&self, id: &ConnId, message: ServerMessage) -> bool {
        let Some(handle) = self.registry.resolve(id).await else {
            debug!(conn = %id, "Dropping message for unknown connection");
            return false;
        };

        if handle.send(message).is_err() {
            debug!(conn = %id, "Outbound queue closed, dropping message");
            return false;
        }
        true
    }
}
