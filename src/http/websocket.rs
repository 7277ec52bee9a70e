//! WebSocket upgrade and session loop.
//!
//! # Responsibilities
//! - Reject upgrades from disallowed origins (403) or over the connection limit (503)
//! - Complete the upgrade and register the session
//! - Drive the session: inbound frames, outbound queue, heartbeat,
//!   authorize deadline, shutdown
//!
//! # Data Flow
//! ```text
//! Client ←──── WebSocket frames ────→ session task ←── Session::send ── application
//! ```

use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::{header::ORIGIN, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc, OwnedSemaphorePermit};
use tokio::time::{sleep, timeout, Instant, Interval, Sleep};

use crate::http::server::AppState;
use crate::observability::metrics;
use crate::realip::ClientIp;
use crate::session::{CloseReason, Session, OUTBOUND_QUEUE_CAPACITY};

/// Time the final close frame gets before the socket is dropped.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Upgrade handler mounted at `server.path`.
pub async fn ws_handler(
    State(state): State<AppState>,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    Extension(client_ip): Extension<ClientIp>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    if !state.origin.allows(&headers) {
        tracing::warn!(
            peer_addr = %peer_addr,
            client_ip = %client_ip.as_str(),
            origin = ?headers.get(ORIGIN),
            "Origin rejected"
        );
        metrics::record_upgrade_rejected("origin");
        return (StatusCode::FORBIDDEN, "Origin not allowed").into_response();
    }

    let permit = match Arc::clone(&state.connection_limit).try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => {
            tracing::warn!(
                peer_addr = %peer_addr,
                client_ip = %client_ip.as_str(),
                active_sessions = state.sessions.len(),
                "Connection limit reached"
            );
            metrics::record_upgrade_rejected("max_connections");
            return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
        }
    };

    ws.on_failed_upgrade(move |error| {
        tracing::warn!(peer_addr = %peer_addr, %error, "WebSocket upgrade failed");
    })
    .on_upgrade(move |socket| run_session(socket, state, peer_addr, client_ip, permit))
}

async fn run_session(
    socket: WebSocket,
    state: AppState,
    peer_addr: SocketAddr,
    client_ip: ClientIp,
    _permit: OwnedSemaphorePermit,
) {
    let (outbound_tx, mut outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
    let session = Arc::new(Session::new(peer_addr, client_ip, outbound_tx));
    let mut shutdown = state.shutdown.subscribe();

    state.sessions.insert(Arc::clone(&session));
    metrics::record_session_opened();
    tracing::info!(
        session_id = %session.id(),
        peer_addr = %peer_addr,
        client_ip = %session.client_ip(),
        "Session opened"
    );
    state.handler.on_open(&session);

    let reason = drive_session(socket, &session, &mut outbound_rx, &state, &mut shutdown).await;

    state.sessions.remove(&session.id());
    state.handler.on_close(&session, reason);
    metrics::record_session_closed(reason.as_str());
    tracing::info!(
        session_id = %session.id(),
        client_ip = %session.client_ip(),
        reason = %reason,
        uptime = ?session.uptime(),
        "Session closed"
    );
}

async fn drive_session(
    socket: WebSocket,
    session: &Arc<Session>,
    outbound_rx: &mut mpsc::Receiver<Message>,
    state: &AppState,
    shutdown: &mut broadcast::Receiver<()>,
) -> CloseReason {
    let (mut sink, mut stream) = socket.split();
    let heartbeat = state.heartbeat;
    let mut ticker = heartbeat.ticker();
    let mut authorize_deadline =
        (!state.authorize_timeout.is_zero()).then(|| Box::pin(sleep(state.authorize_timeout)));
    let mut last_seen = Instant::now();

    let reason = loop {
        if authorize_deadline.is_some() && session.is_authorized() {
            authorize_deadline = None;
        }

        tokio::select! {
            inbound = stream.next() => match inbound {
                None | Some(Ok(Message::Close(_))) => break CloseReason::ClientClosed,
                Some(Ok(message)) => {
                    last_seen = Instant::now();
                    // Pings are answered by the protocol layer; pongs only count as liveness.
                    if matches!(message, Message::Text(_) | Message::Binary(_)) {
                        state.handler.on_message(session, message);
                    }
                }
                Some(Err(error)) => {
                    tracing::debug!(session_id = %session.id(), %error, "Receive failed");
                    break CloseReason::Error;
                }
            },
            Some(message) = outbound_rx.recv() => {
                let closing = matches!(message, Message::Close(_));
                // A peer that stops reading stalls the send; give up once the queue fills.
                tokio::select! {
                    sent = sink.send(message) => {
                        if let Err(error) = sent {
                            tracing::debug!(session_id = %session.id(), %error, "Send failed");
                            break CloseReason::Error;
                        }
                    }
                    _ = session.lagged() => break CloseReason::Lagging,
                }
                if closing {
                    break CloseReason::ServerClosed;
                }
            }
            _ = session.lagged() => break CloseReason::Lagging,
            _ = next_tick(&mut ticker) => {
                if heartbeat.is_expired(last_seen, Instant::now()) {
                    break CloseReason::HeartbeatTimeout;
                }
                if heartbeat.sends_ping() && sink.send(Message::Ping(Bytes::new())).await.is_err() {
                    break CloseReason::Error;
                }
            }
            _ = expire(&mut authorize_deadline), if authorize_deadline.is_some() => {
                // Authorization may land while the deadline is already firing.
                if !session.is_authorized() {
                    break CloseReason::AuthorizeTimeout;
                }
                authorize_deadline = None;
            }
            _ = shutdown.recv() => break CloseReason::Shutdown,
        }
    };

    let farewell = async {
        if let Some(frame) = reason.close_frame() {
            let _ = sink.send(Message::Close(Some(frame))).await;
        }
        let _ = sink.close().await;
    };
    if timeout(CLOSE_TIMEOUT, farewell).await.is_err() {
        tracing::debug!(session_id = %session.id(), %reason, "Close frame not delivered");
    }
    reason
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn expire(deadline: &mut Option<Pin<Box<Sleep>>>) {
    match deadline {
        Some(deadline) => deadline.as_mut().await,
        None => std::future::pending().await,
    }
}
