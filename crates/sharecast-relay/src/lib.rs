//! sharecast-relay: WebSocket signaling relay for browser screen sharing.
//!
//! Clients create and join sessions, announce when they start or stop
//! sharing their screen, and exchange WebRTC negotiation payloads through
//! the relay. The relay never inspects those payloads; media flows
//! peer to peer.

pub mod connection;
pub mod coordinator;
pub mod dispatcher;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;

use sharecast_common::ConnId;
use sharecast_config::LimitsConfig;

pub use coordinator::{Coordinator, Inbound, Outbound, Recipients};
pub use dispatcher::Dispatcher;
pub use protocol::{ClientEvent, ServerEvent, ServerMessage};
pub use registry::ConnectionRegistry;
pub use server::serve;
pub use session::SessionStore;

/// Shared state handed to every connection task.
#[derive(Clone)]
pub struct Relay {
    pub registry: ConnectionRegistry,
    pub store: SessionStore,
    pub coordinator: Coordinator,
    pub dispatcher: Dispatcher,
    pub limits: LimitsConfig,
}

impl Relay {
    pub fn new(limits: LimitsConfig) -> Self {
        let registry = ConnectionRegistry::new();
        let store = SessionStore::new();
        Self {
            coordinator: Coordinator::new(store.clone()),
            dispatcher: Dispatcher::new(registry.clone(), store.clone()),
            registry,
            store,
            limits,
        }
    }

    /// Run one event from `conn` and deliver what it produces.
    pub async fn process(&self, conn: &ConnId, inbound: Inbound) {
        let effects = self.coordinator.handle(conn, inbound).await;
        self.dispatcher.dispatch(effects).await;
    }
}
