//! Per-connection handler: register, forward frames, then clean up.

use std::net::SocketAddr;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use sharecast_common::ConnId;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::WebSocketStream;

use crate::coordinator::Inbound;
use crate::protocol::{ClientEvent, ServerEvent, ServerMessage};
use crate::Relay;

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsStream = SplitStream<WebSocketStream<TcpStream>>;

/// Handle a single WebSocket connection until it closes.
pub async fn handle_connection(ws: WebSocketStream<TcpStream>, addr: SocketAddr, relay: Relay) {
    let (mut sink, stream) = ws.split();

    let (tx, rx) = mpsc::unbounded_channel::<ServerMessage>();
    let conn_id = relay.registry.register(tx).await;

    tracing::info!(peer = %addr, conn = %conn_id, "Client connected");

    let hello = ServerMessage::from(ServerEvent::Connected {
        connection_id: conn_id.clone(),
    });
    if send_message(&mut sink, &hello).await.is_ok() {
        forward(&mut sink, stream, rx, &conn_id, &relay).await;
    }

    // Every session must be cleaned up before the handle goes away.
    relay.process(&conn_id, Inbound::Disconnect).await;
    relay.registry.unregister(&conn_id).await;

    let sessions = relay.store.count().await;
    tracing::info!(peer = %addr, conn = %conn_id, sessions, "Client disconnected");
}

async fn forward(
    sink: &mut WsSink,
    mut stream: WsStream,
    mut rx: mpsc::UnboundedReceiver<ServerMessage>,
    conn_id: &ConnId,
    relay: &Relay,
) {
    loop {
        tokio::select! {
            // Queued messages → this client's socket
            Some(msg) = rx.recv() => {
                if send_message(sink, &msg).await.is_err() {
                    break;
                }
            }

            // Frames from this client → coordinator
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => match ClientEvent::decode(&text) {
                        Ok(event) => {
                            tracing::trace!(conn = %conn_id, event = event.name(), "Inbound event");
                            relay.process(conn_id, Inbound::Client(event)).await;
                        }
                        Err(e) => {
                            tracing::warn!(conn = %conn_id, error = %e, "Ignoring malformed frame");
                        }
                    },
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(conn = %conn_id, error = %e, "WS error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Send a ServerMessage as a JSON text frame.
async fn send_message(
    sink: &mut WsSink,
    message: &ServerMessage,
) -> Result<(), tungstenite::Error> {
    let json = match message.encode() {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode outbound message");
            return Ok(());
        }
    };
    sink.send(Message::Text(json.into())).await
}
