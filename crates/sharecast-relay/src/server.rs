//! Accept loop: origin-checked WebSocket handshakes, one task per client.

use std::future::Future;
use std::sync::Arc;

use sharecast_config::ServerConfig;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_hdr_async_with_config;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

use crate::connection::handle_connection;
use crate::Relay;

/// Serve connections from `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    relay: Relay,
    server: ServerConfig,
    shutdown: impl Future<Output = ()>,
) {
    let server = Arc::new(server);
    let ws_config = WebSocketConfig::default()
        .max_message_size(Some(relay.limits.max_message_bytes))
        .max_frame_size(Some(relay.limits.max_message_bytes));

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutting down accept loop");
                return;
            }

            accepted = listener.accept() => {
                let (stream, addr) = match accepted {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!(error = %e, "TCP accept error");
                        continue;
                    }
                };

                let relay = relay.clone();
                let server = server.clone();
                tokio::spawn(async move {
                    let check = |req: &Request, resp: Response| check_origin(&server, req, resp);
                    match accept_hdr_async_with_config(stream, check, Some(ws_config)).await {
                        Ok(ws) => handle_connection(ws, addr, relay).await,
                        Err(e) => {
                            tracing::warn!(peer = %addr, error = %e, "WS handshake failed");
                        }
                    }
                });
            }
        }
    }
}

/// Reject browser handshakes whose `Origin` is not allowed. Requests
/// without an `Origin` header come from non-browser clients and pass.
fn check_origin(
    server: &ServerConfig,
    req: &Request,
    resp: Response,
) -> Result<Response, ErrorResponse> {
    let origin = req
        .headers()
        .get("origin")
        .and_then(|v| v.to_str().ok());

    match origin {
        Some(origin) if !server.origin_allowed(origin) => {
            tracing::warn!(origin, "Rejecting handshake from disallowed origin");
            let mut err = ErrorResponse::new(Some("origin not allowed".into()));
            *err.status_mut() = StatusCode::FORBIDDEN;
            Err(err)
        }
        _ => Ok(resp),
    }
}
