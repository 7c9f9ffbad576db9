//! Session store: maps session ids to participants and active sharers.
//!
//! Every operation takes the store lock once, so concurrent events for
//! the same session never interleave their read-modify-write steps.
//! Participants and sharers keep insertion order.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sharecast_common::{ConnId, SessionId};
use tokio::sync::RwLock;

/// Metadata recorded when a participant starts sharing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareInfo {
    pub started_at: DateTime<Utc>,
}

/// A group of connections sharing signaling and screen-share state.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    /// Creator of the session. Never reassigned, even after the host leaves.
    pub host_id: ConnId,
    pub participants: Vec<ConnId>,
    pub active_sharers: Vec<(ConnId, ShareInfo)>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    fn new(host_id: ConnId) -> Self {
        Self {
            id: SessionId::new(),
            participants: vec![host_id.clone()],
            host_id,
            active_sharers: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn is_participant(&self, conn: &ConnId) -> bool {
        self.participants.contains(conn)
    }

    pub fn is_sharing(&self, conn: &ConnId) -> bool {
        self.active_sharers.iter().any(|(id, _)| id == conn)
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            participants: self.participants.clone(),
            active_sharers: self.active_sharers.clone(),
        }
    }

    /// Drop `conn` from both sets. `None` if it was not a participant.
    fn remove(&mut self, conn: &ConnId) -> Option<bool> {
        let pos = self.participants.iter().position(|id| id == conn)?;
        self.participants.remove(pos);

        let was_sharing = self.is_sharing(conn);
        self.active_sharers.retain(|(id, _)| id != conn);
        Some(was_sharing)
    }
}

/// State returned to a participant that just joined.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub participants: Vec<ConnId>,
    pub active_sharers: Vec<(ConnId, ShareInfo)>,
}

/// Outcome of removing a participant from one session.
#[derive(Debug, Clone, PartialEq)]
pub struct Departure {
    pub session_id: SessionId,
    pub was_sharing: bool,
    pub remaining: Vec<ConnId>,
    pub session_deleted: bool,
}

/// Thread-safe session store.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session with `host` as its only participant.
    pub async fn create_session(&self, host: &ConnId) -> SessionId {
        let mut map = self.sessions.write().await;
        let mut session = Session::new(host.clone());
        while map.contains_key(&session.id) {
            session.id = SessionId::new();
        }
        let id = session.id.clone();
        map.insert(id.clone(), session);
        id
    }

    /// Add `conn` to a session. Re-joining is a no-op. `None` if the
    /// session does not exist.
    pub async fn join_session(
        &self,
        session_id: &SessionId,
        conn: &ConnId,
    ) -> Option<SessionSnapshot> {
        let mut map = self.sessions.write().await;
        let session = map.get_mut(session_id)?;
        if !session.is_participant(conn) {
            session.participants.push(conn.clone());
        }
        Some(session.snapshot())
    }

    /// Mark `conn` as sharing and return the participants at that moment.
    /// `None`, with nothing mutated, if the session is unknown or `conn` is
    /// not a participant.
    pub async fn start_sharing(
        &self,
        session_id: &SessionId,
        conn: &ConnId,
    ) -> Option<Vec<ConnId>> {
        let mut map = self.sessions.write().await;
        let session = map.get_mut(session_id)?;
        if !session.is_participant(conn) {
            return None;
        }

        let info = ShareInfo {
            started_at: Utc::now(),
        };
        match session.active_sharers.iter_mut().find(|(id, _)| id == conn) {
            Some((_, existing)) => *existing = info,
            None => session.active_sharers.push((conn.clone(), info)),
        }
        Some(session.participants.clone())
    }

    /// Clear `conn`'s sharing flag. Returns the participants at that moment
    /// if `conn` is one of them, `None` otherwise.
    pub async fn stop_sharing(
        &self,
        session_id: &SessionId,
        conn: &ConnId,
    ) -> Option<Vec<ConnId>> {
        let mut map = self.sessions.write().await;
        let session = map.get_mut(session_id)?;
        session.active_sharers.retain(|(id, _)| id != conn);
        session
            .is_participant(conn)
            .then(|| session.participants.clone())
    }

    /// Remove `conn` from one session, deleting the session if it empties.
    /// `None` if the session is unknown or `conn` was not in it.
    pub async fn remove_participant(
        &self,
        session_id: &SessionId,
        conn: &ConnId,
    ) -> Option<Departure> {
        let mut map = self.sessions.write().await;
        let session = map.get_mut(session_id)?;
        let was_sharing = session.remove(conn)?;
        let remaining = session.participants.clone();

        let session_deleted = remaining.is_empty();
        if session_deleted {
            map.remove(session_id);
        }

        Some(Departure {
            session_id: session_id.clone(),
            was_sharing,
            remaining,
            session_deleted,
        })
    }

    /// Remove `conn` from every session it belongs to, in one step.
    pub async fn remove_from_all(&self, conn: &ConnId) -> Vec<Departure> {
        let mut map = self.sessions.write().await;
        let mut departures = Vec::new();

        for (id, session) in map.iter_mut() {
            if let Some(was_sharing) = session.remove(conn) {
                departures.push(Departure {
                    session_id: id.clone(),
                    was_sharing,
                    remaining: session.participants.clone(),
                    session_deleted: session.participants.is_empty(),
                });
            }
        }

        map.retain(|_, session| !session.participants.is_empty());
        departures
    }

    /// Participants of a session; empty if the session is unknown.
    pub async fn list_participants(&self, session_id: &SessionId) -> Vec<ConnId> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|s| s.participants.clone())
            .unwrap_or_default()
    }

    /// Active sharers of a session; empty if the session is unknown.
    pub async fn list_active_sharers(&self, session_id: &SessionId) -> Vec<(ConnId, ShareInfo)> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|s| s.active_sharers.clone())
            .unwrap_or_default()
    }

    pub async fn get(&self, session_id: &SessionId) -> Option<Session> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn exists(&self, session_id: &SessionId) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    /// Number of live sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
