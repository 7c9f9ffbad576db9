//! Coordinator behaviour, driven end to end through the dispatcher with
//! in-memory queues standing in for sockets.

use super::*;
use crate::dispatcher::Dispatcher;
use crate::registry::ConnectionRegistry;
use serde_json::json;
use tokio::sync::mpsc;

struct Harness {
    registry: ConnectionRegistry,
    store: SessionStore,
    coordinator: Coordinator,
    dispatcher: Dispatcher,
}

struct Client {
    id: ConnId,
    rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Client {
    fn drain(&mut self) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            out.push(msg);
        }
        out
    }
}

impl Harness {
    fn new() -> Self {
        let registry = ConnectionRegistry::new();
        let store = SessionStore::new();
        Self {
            coordinator: Coordinator::new(store.clone()),
            dispatcher: Dispatcher::new(registry.clone(), store.clone()),
            registry,
            store,
        }
    }

    async fn connect(&self) -> Client {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.registry.register(tx).await;
        Client { id, rx }
    }

    async fn send(&self, client: &Client, event: ClientEvent) {
        let effects = self.coordinator.handle(&client.id, Inbound::Client(event)).await;
        self.dispatcher.dispatch(effects).await;
    }

    async fn disconnect(&self, client: Client) {
        let effects = self.coordinator.handle(&client.id, Inbound::Disconnect).await;
        self.dispatcher.dispatch(effects).await;
        self.registry.unregister(&client.id).await;
    }

    async fn create(&self, client: &mut Client) -> SessionId {
        self.send(client, ClientEvent::CreateSession).await;
        match client.drain().as_slice() {
            [ServerMessage::Event(ServerEvent::SessionCreated { session_id, role })] => {
                assert_eq!(*role, Role::Host);
                session_id.clone()
            }
            other => panic!("expected session-created, got {other:?}"),
        }
    }
}

fn started(user: &ConnId, session: &SessionId) -> ServerMessage {
    ServerEvent::UserStartedSharing {
        user_id: user.clone(),
        session_id: session.clone(),
    }
    .into()
}

fn stopped(user: &ConnId, session: &SessionId) -> ServerMessage {
    ServerEvent::UserStoppedSharing {
        user_id: user.clone(),
        session_id: session.clone(),
    }
    .into()
}

fn joined(user: &ConnId, total: &[&ConnId]) -> ServerMessage {
    ServerEvent::ParticipantJoined {
        participant_id: user.clone(),
        total_participants: total.iter().map(|c| (*c).clone()).collect(),
    }
    .into()
}

fn left(user: &ConnId, total: &[&ConnId]) -> ServerMessage {
    ServerEvent::ParticipantLeft {
        participant_id: user.clone(),
        total_participants: total.iter().map(|c| (*c).clone()).collect(),
    }
    .into()
}

fn reply(ack: Option<u64>, data: &[&ConnId]) -> ServerMessage {
    ServerMessage::Reply {
        ack,
        data: data.iter().map(|c| (*c).clone()).collect(),
    }
}

#[tokio::test]
async fn create_then_get_participants_returns_host() {
    let h = Harness::new();
    let mut a = h.connect().await;
    let sid = h.create(&mut a).await;

    h.send(
        &a,
        ClientEvent::GetParticipants {
            session_id: sid,
            ack: Some(1),
        },
    )
    .await;
    assert_eq!(a.drain(), vec![reply(Some(1), &[&a.id])]);
}

#[tokio::test]
async fn get_participants_for_unknown_session_is_empty() {
    let h = Harness::new();
    let mut a = h.connect().await;
    h.send(
        &a,
        ClientEvent::GetParticipants {
            session_id: SessionId::from("nope"),
            ack: None,
        },
    )
    .await;
    assert_eq!(a.drain(), vec![reply(None, &[])]);
}

#[tokio::test]
async fn join_notifies_everyone_including_joiner() {
    let h = Harness::new();
    let mut a = h.connect().await;
    let mut b = h.connect().await;
    let sid = h.create(&mut a).await;

    h.send(&b, ClientEvent::JoinSession(sid)).await;

    let expected = joined(&b.id, &[&a.id, &b.id]);
    assert_eq!(a.drain(), vec![expected.clone()]);
    assert_eq!(b.drain(), vec![expected]);
}

#[tokio::test]
async fn join_unknown_session_replies_error_only_to_sender() {
    let h = Harness::new();
    let mut a = h.connect().await;
    let mut b = h.connect().await;
    let _sid = h.create(&mut a).await;

    h.send(&b, ClientEvent::JoinSession(SessionId::from("missing"))).await;

    assert_eq!(
        b.drain(),
        vec![ServerMessage::from(ServerEvent::Error("Session not found".into()))]
    );
    assert!(a.drain().is_empty());
    assert_eq!(h.store.count().await, 1);
}

#[tokio::test]
async fn joining_twice_keeps_participant_set() {
    let h = Harness::new();
    let mut a = h.connect().await;
    let b = h.connect().await;
    let sid = h.create(&mut a).await;

    h.send(&b, ClientEvent::JoinSession(sid.clone())).await;
    h.send(&b, ClientEvent::JoinSession(sid.clone())).await;

    assert_eq!(h.store.list_participants(&sid).await, vec![a.id.clone(), b.id.clone()]);
}

#[tokio::test]
async fn start_sharing_reaches_everyone_but_sharer_exactly_once() {
    let h = Harness::new();
    let mut a = h.connect().await;
    let mut b = h.connect().await;
    let mut c = h.connect().await;
    let sid = h.create(&mut a).await;
    h.send(&b, ClientEvent::JoinSession(sid.clone())).await;
    h.send(&c, ClientEvent::JoinSession(sid.clone())).await;
    a.drain();
    b.drain();
    c.drain();

    h.send(&b, ClientEvent::StartSharing(sid.clone())).await;

    assert_eq!(a.drain(), vec![started(&b.id, &sid)]);
    assert_eq!(c.drain(), vec![started(&b.id, &sid)]);
    assert!(b.drain().is_empty());
}

#[tokio::test]
async fn join_between_share_commit_and_delivery_gets_one_notification() {
    let h = Harness::new();
    let mut a = h.connect().await;
    let mut b = h.connect().await;
    let mut c = h.connect().await;
    let sid = h.create(&mut a).await;
    h.send(&b, ClientEvent::JoinSession(sid.clone())).await;
    a.drain();
    b.drain();

    // a's share is committed, then c joins before the broadcast goes out.
    let effects = h
        .coordinator
        .handle(&a.id, Inbound::Client(ClientEvent::StartSharing(sid.clone())))
        .await;
    h.send(&c, ClientEvent::JoinSession(sid.clone())).await;
    h.dispatcher.dispatch(effects).await;

    assert_eq!(
        c.drain(),
        vec![joined(&c.id, &[&a.id, &b.id, &c.id]), started(&a.id, &sid)]
    );
    assert_eq!(
        b.drain(),
        vec![joined(&c.id, &[&a.id, &b.id, &c.id]), started(&a.id, &sid)]
    );
}

#[tokio::test]
async fn join_between_departure_and_delivery_misses_stale_leave() {
    let h = Harness::new();
    let mut a = h.connect().await;
    let b = h.connect().await;
    let mut c = h.connect().await;
    let sid = h.create(&mut a).await;
    h.send(&b, ClientEvent::JoinSession(sid.clone())).await;
    a.drain();

    let b_id = b.id.clone();
    let effects = h.coordinator.handle(&b.id, Inbound::Disconnect).await;
    h.send(&c, ClientEvent::JoinSession(sid.clone())).await;
    h.dispatcher.dispatch(effects).await;

    // c joined after b was gone, so it only hears about its own join.
    assert_eq!(c.drain(), vec![joined(&c.id, &[&a.id, &c.id])]);
    assert_eq!(
        a.drain(),
        vec![joined(&c.id, &[&a.id, &c.id]), left(&b_id, &[&a.id])]
    );
}

#[tokio::test]
async fn start_sharing_by_outsider_is_ignored() {
    let h = Harness::new();
    let mut a = h.connect().await;
    let mut outsider = h.connect().await;
    let sid = h.create(&mut a).await;

    h.send(&outsider, ClientEvent::StartSharing(sid.clone())).await;

    assert!(a.drain().is_empty());
    assert!(outsider.drain().is_empty());
    assert!(h.store.list_active_sharers(&sid).await.is_empty());
}

#[tokio::test]
async fn late_joiner_gets_catch_up_for_each_sharer() {
    let h = Harness::new();
    let mut a = h.connect().await;
    let mut b = h.connect().await;
    let mut c = h.connect().await;
    let sid = h.create(&mut a).await;
    h.send(&b, ClientEvent::JoinSession(sid.clone())).await;
    h.send(&a, ClientEvent::StartSharing(sid.clone())).await;
    h.send(&b, ClientEvent::StartSharing(sid.clone())).await;
    a.drain();
    b.drain();

    h.send(&c, ClientEvent::JoinSession(sid.clone())).await;

    assert_eq!(
        c.drain(),
        vec![
            joined(&c.id, &[&a.id, &b.id, &c.id]),
            started(&a.id, &sid),
            started(&b.id, &sid),
        ]
    );
    // Existing members only see the join.
    assert_eq!(a.drain(), vec![joined(&c.id, &[&a.id, &b.id, &c.id])]);
}

#[tokio::test]
async fn stop_sharing_notifies_others() {
    let h = Harness::new();
    let mut a = h.connect().await;
    let mut b = h.connect().await;
    let sid = h.create(&mut a).await;
    h.send(&b, ClientEvent::JoinSession(sid.clone())).await;
    h.send(&a, ClientEvent::StartSharing(sid.clone())).await;
    a.drain();
    b.drain();

    h.send(&a, ClientEvent::StopSharing(sid.clone())).await;

    assert_eq!(b.drain(), vec![stopped(&a.id, &sid)]);
    assert!(a.drain().is_empty());
    assert!(h.store.list_active_sharers(&sid).await.is_empty());
}

#[tokio::test]
async fn stop_sharing_by_outsider_is_silent() {
    let h = Harness::new();
    let mut a = h.connect().await;
    let outsider = h.connect().await;
    let sid = h.create(&mut a).await;

    h.send(&outsider, ClientEvent::StopSharing(sid)).await;
    assert!(a.drain().is_empty());
}

#[tokio::test]
async fn signal_is_relayed_verbatim_with_sender() {
    let h = Harness::new();
    let mut a = h.connect().await;
    let mut b = h.connect().await;
    let payload = json!({"type": "offer", "sdp": "v=0\r\n", "extra": [1, 2, 3]});

    h.send(
        &a,
        ClientEvent::Signal {
            to: b.id.clone(),
            signal: payload.clone(),
        },
    )
    .await;

    assert_eq!(
        b.drain(),
        vec![ServerMessage::from(ServerEvent::Signal {
            from: a.id.clone(),
            signal: payload,
        })]
    );
    assert!(a.drain().is_empty());
}

#[tokio::test]
async fn signal_to_unknown_target_is_dropped_silently() {
    let h = Harness::new();
    let mut a = h.connect().await;

    h.send(
        &a,
        ClientEvent::Signal {
            to: ConnId::from("ghost"),
            signal: json!({"candidate": "x"}),
        },
    )
    .await;

    assert!(a.drain().is_empty());
}

#[tokio::test]
async fn last_participant_leaving_deletes_session() {
    let h = Harness::new();
    let mut a = h.connect().await;
    let mut b = h.connect().await;
    let sid = h.create(&mut a).await;

    h.disconnect(a).await;

    h.send(&b, ClientEvent::JoinSession(sid.clone())).await;
    assert_eq!(
        b.drain(),
        vec![ServerMessage::from(ServerEvent::Error("Session not found".into()))]
    );
    assert!(!h.store.exists(&sid).await);
}

#[tokio::test]
async fn disconnect_from_two_sessions_notifies_both() {
    let h = Harness::new();
    let mut a = h.connect().await;
    let mut b = h.connect().await;
    let mut x = h.connect().await;
    let s1 = h.create(&mut a).await;
    let s2 = h.create(&mut b).await;
    h.send(&x, ClientEvent::JoinSession(s1.clone())).await;
    h.send(&x, ClientEvent::JoinSession(s2.clone())).await;
    h.send(&x, ClientEvent::StartSharing(s2.clone())).await;
    a.drain();
    b.drain();
    x.drain();

    let x_id = x.id.clone();
    h.disconnect(x).await;

    assert_eq!(a.drain(), vec![left(&x_id, &[&a.id])]);
    assert_eq!(b.drain(), vec![left(&x_id, &[&b.id]), stopped(&x_id, &s2)]);
    assert!(h.store.list_active_sharers(&s2).await.is_empty());
    assert_eq!(h.store.list_participants(&s1).await, vec![a.id.clone()]);
}

#[tokio::test]
async fn host_leaving_keeps_session_without_reassigning_host() {
    let h = Harness::new();
    let mut a = h.connect().await;
    let b = h.connect().await;
    let sid = h.create(&mut a).await;
    h.send(&b, ClientEvent::JoinSession(sid.clone())).await;

    let a_id = a.id.clone();
    h.disconnect(a).await;

    let session = h.store.get(&sid).await.unwrap();
    assert_eq!(session.participants, vec![b.id.clone()]);
    assert_eq!(session.host_id, a_id);
}

#[tokio::test]
async fn full_scenario() {
    let h = Harness::new();
    let mut a = h.connect().await;
    let mut b = h.connect().await;

    let sid = h.create(&mut a).await;

    h.send(&b, ClientEvent::JoinSession(sid.clone())).await;
    let expected = joined(&b.id, &[&a.id, &b.id]);
    assert_eq!(a.drain(), vec![expected.clone()]);
    assert_eq!(b.drain(), vec![expected]);

    h.send(&a, ClientEvent::StartSharing(sid.clone())).await;
    assert_eq!(b.drain(), vec![started(&a.id, &sid)]);
    assert!(a.drain().is_empty());

    h.send(
        &b,
        ClientEvent::GetParticipants {
            session_id: sid.clone(),
            ack: Some(9),
        },
    )
    .await;
    assert_eq!(b.drain(), vec![reply(Some(9), &[&a.id, &b.id])]);

    let a_id = a.id.clone();
    h.disconnect(a).await;
    assert_eq!(b.drain(), vec![left(&a_id, &[&b.id]), stopped(&a_id, &sid)]);

    h.send(
        &b,
        ClientEvent::GetParticipants {
            session_id: sid.clone(),
            ack: Some(10),
        },
    )
    .await;
    assert_eq!(b.drain(), vec![reply(Some(10), &[&b.id])]);
}
