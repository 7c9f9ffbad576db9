//! Wire protocol. Every frame is a JSON text frame.
//!
//! Inbound: `{"event": "...", "data": ..., "ack": n}`.
//! Outbound: `{"event": "...", "data": ...}` or, for direct replies,
//! `{"ack": n, "data": ...}`. Signal payloads are never inspected.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sharecast_common::{ConnId, ProtocolError, SessionId};

/// Inbound event names.
pub mod events {
    pub const CREATE_SESSION: &str = "create-session";
    pub const JOIN_SESSION: &str = "join-session";
    pub const GET_PARTICIPANTS: &str = "get-participants";
    pub const START_SHARING: &str = "start-sharing";
    pub const STOP_SHARING: &str = "stop-sharing";
    pub const SIGNAL: &str = "signal";
}

/// Error text sent when a join names an unknown session.
pub const SESSION_NOT_FOUND: &str = "Session not found";

#[derive(Debug, Deserialize)]
struct RawFrame {
    event: String,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    ack: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SignalPayload {
    to: ConnId,
    #[serde(default)]
    signal: Value,
}

/// A decoded client frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    CreateSession,
    JoinSession(SessionId),
    /// `ack` is echoed back on the reply so the client can match it.
    GetParticipants {
        session_id: SessionId,
        ack: Option<u64>,
    },
    StartSharing(SessionId),
    StopSharing(SessionId),
    Signal {
        to: ConnId,
        signal: Value,
    },
}

impl ClientEvent {
    /// Decode one text frame.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let frame: RawFrame = serde_json::from_str(text)?;

        match frame.event.as_str() {
            events::CREATE_SESSION => Ok(Self::CreateSession),
            events::JOIN_SESSION => Ok(Self::JoinSession(session_id(&frame)?)),
            events::GET_PARTICIPANTS => Ok(Self::GetParticipants {
                session_id: session_id(&frame)?,
                ack: frame.ack,
            }),
            events::START_SHARING => Ok(Self::StartSharing(session_id(&frame)?)),
            events::STOP_SHARING => Ok(Self::StopSharing(session_id(&frame)?)),
            events::SIGNAL => {
                let payload: SignalPayload =
                    serde_json::from_value(frame.data).map_err(|e| ProtocolError::InvalidPayload {
                        event: events::SIGNAL.into(),
                        reason: e.to_string(),
                    })?;
                Ok(Self::Signal {
                    to: payload.to,
                    signal: payload.signal,
                })
            }
            _ => Err(ProtocolError::UnknownEvent(frame.event.clone())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateSession => events::CREATE_SESSION,
            Self::JoinSession(_) => events::JOIN_SESSION,
            Self::GetParticipants { .. } => events::GET_PARTICIPANTS,
            Self::StartSharing(_) => events::START_SHARING,
            Self::StopSharing(_) => events::STOP_SHARING,
            Self::Signal { .. } => events::SIGNAL,
        }
    }
}

fn session_id(frame: &RawFrame) -> Result<SessionId, ProtocolError> {
    frame
        .data
        .as_str()
        .map(SessionId::from)
        .ok_or_else(|| ProtocolError::InvalidPayload {
            event: frame.event.clone(),
            reason: "expected a session id string".into(),
        })
}

/// Role reported back to the creator of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
}

/// Named events the relay pushes to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    Connected { connection_id: ConnId },

    #[serde(rename_all = "camelCase")]
    SessionCreated { session_id: SessionId, role: Role },

    #[serde(rename_all = "camelCase")]
    ParticipantJoined {
        participant_id: ConnId,
        total_participants: Vec<ConnId>,
    },

    #[serde(rename_all = "camelCase")]
    ParticipantLeft {
        participant_id: ConnId,
        total_participants: Vec<ConnId>,
    },

    #[serde(rename_all = "camelCase")]
    UserStartedSharing { user_id: ConnId, session_id: SessionId },

    #[serde(rename_all = "camelCase")]
    UserStoppedSharing { user_id: ConnId, session_id: SessionId },

    Signal { from: ConnId, signal: Value },

    Error(String),
}

/// Everything that can be written to a client socket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Event(ServerEvent),
    Reply {
        #[serde(skip_serializing_if = "Option::is_none")]
        ack: Option<u64>,
        data: Vec<ConnId>,
    },
}

impl ServerMessage {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<ServerEvent> for ServerMessage {
    fn from(event: ServerEvent) -> Self {
        Self::Event(event)
    }
}
