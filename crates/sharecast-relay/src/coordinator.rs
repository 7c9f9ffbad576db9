//! Signaling coordinator: turns one inbound event into store mutations
//! plus a list of outbound effects.
//!
//! The coordinator never touches a socket. It returns [`Outbound`]
//! values describing who should receive what, and the dispatcher
//! delivers them. Recipient lists are taken from the same store call
//! that made the change, so a broadcast reaches exactly the
//! participants present when the change happened.

use sharecast_common::{ConnId, SessionId};
use tracing::{debug, info};

use crate::protocol::{ClientEvent, Role, ServerEvent, ServerMessage, SESSION_NOT_FOUND};
use crate::session::SessionStore;

/// Something that happened on a connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Client(ClientEvent),
    Disconnect,
}

/// Who an outbound message is addressed to.
#[derive(Debug, Clone, PartialEq)]
pub enum Recipients {
    One(ConnId),
    Many(Vec<ConnId>),
}

/// One message to deliver.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub to: Recipients,
    pub message: ServerMessage,
}

impl Outbound {
    pub fn one(to: &ConnId, message: impl Into<ServerMessage>) -> Self {
        Self {
            to: Recipients::One(to.clone()),
            message: message.into(),
        }
    }

    /// Address `participants`, skipping `exclude`.
    pub fn many(
        participants: &[ConnId],
        exclude: Option<&ConnId>,
        message: impl Into<ServerMessage>,
    ) -> Self {
        let to = participants
            .iter()
            .filter(|id| Some(*id) != exclude)
            .cloned()
            .collect();
        Self {
            to: Recipients::Many(to),
            message: message.into(),
        }
    }
}

#[derive(Clone)]
pub struct Coordinator {
    store: SessionStore,
}

impl Coordinator {
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    /// Apply one event sent by `sender`.
    pub async fn handle(&self, sender: &ConnId, inbound: Inbound) -> Vec<Outbound> {
        match inbound {
            Inbound::Client(event) => self.handle_client(sender, event).await,
            Inbound::Disconnect => self.disconnect(sender).await,
        }
    }

    async fn handle_client(&self, sender: &ConnId, event: ClientEvent) -> Vec<Outbound> {
        match event {
            ClientEvent::CreateSession => {
                let session_id = self.store.create_session(sender).await;
                info!(conn = %sender, session = %session_id, "Session created");
                vec![Outbound::one(
                    sender,
                    ServerEvent::SessionCreated {
                        session_id,
                        role: Role::Host,
                    },
                )]
            }

            ClientEvent::JoinSession(session_id) => self.join(sender, session_id).await,

            ClientEvent::GetParticipants { session_id, ack } => {
                let data = self.store.list_participants(&session_id).await;
                vec![Outbound::one(sender, ServerMessage::Reply { ack, data })]
            }

            ClientEvent::StartSharing(session_id) => {
                let Some(participants) = self.store.start_sharing(&session_id, sender).await else {
                    debug!(conn = %sender, session = %session_id, "Ignoring start-sharing");
                    return Vec::new();
                };
                debug!(conn = %sender, session = %session_id, "Started sharing");
                vec![Outbound::many(
                    &participants,
                    Some(sender),
                    ServerEvent::UserStartedSharing {
                        user_id: sender.clone(),
                        session_id: session_id.clone(),
                    },
                )]
            }

            ClientEvent::StopSharing(session_id) => {
                let Some(participants) = self.store.stop_sharing(&session_id, sender).await else {
                    debug!(conn = %sender, session = %session_id, "Ignoring stop-sharing");
                    return Vec::new();
                };
                debug!(conn = %sender, session = %session_id, "Stopped sharing");
                vec![Outbound::many(
                    &participants,
                    Some(sender),
                    ServerEvent::UserStoppedSharing {
                        user_id: sender.clone(),
                        session_id: session_id.clone(),
                    },
                )]
            }

            ClientEvent::Signal { to, signal } => vec![Outbound::one(
                &to,
                ServerEvent::Signal {
                    from: sender.clone(),
                    signal,
                },
            )],
        }
    }

    async fn join(&self, sender: &ConnId, session_id: SessionId) -> Vec<Outbound> {
        let Some(snapshot) = self.store.join_session(&session_id, sender).await else {
            debug!(conn = %sender, session = %session_id, "Join for unknown session");
            return vec![Outbound::one(sender, ServerEvent::Error(SESSION_NOT_FOUND.into()))];
        };

        debug!(
            conn = %sender,
            session = %session_id,
            participants = snapshot.participants.len(),
            "Participant joined"
        );

        let mut out = vec![Outbound::many(
            &snapshot.participants,
            None,
            ServerEvent::ParticipantJoined {
                participant_id: sender.clone(),
                total_participants: snapshot.participants.clone(),
            },
        )];

        // Late joiners missed the original broadcasts.
        out.extend(snapshot.active_sharers.into_iter().map(|(sharer, _)| {
            Outbound::one(
                sender,
                ServerEvent::UserStartedSharing {
                    user_id: sharer,
                    session_id: session_id.clone(),
                },
            )
        }));
        out
    }

    async fn disconnect(&self, sender: &ConnId) -> Vec<Outbound> {
        let mut out = Vec::new();

        for departure in self.store.remove_from_all(sender).await {
            if departure.session_deleted {
                info!(session = %departure.session_id, "Session deleted");
                continue;
            }

            out.push(Outbound::many(
                &departure.remaining,
                None,
                ServerEvent::ParticipantLeft {
                    participant_id: sender.clone(),
                    total_participants: departure.remaining.clone(),
                },
            ));

            if departure.was_sharing {
                out.push(Outbound::many(
                    &departure.remaining,
                    None,
                    ServerEvent::UserStoppedSharing {
                        user_id: sender.clone(),
                        session_id: departure.session_id.clone(),
                    },
                ));
            }
        }

        out
    }
}

#[cfg(test)]
mod tests;
