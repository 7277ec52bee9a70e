//! Session state shared between the session task and application code.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::body::Bytes;
use axum::extract::ws::{close_code, CloseFrame, Message};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;
use tokio::time::{Duration, Instant};
use uuid::Uuid;

use crate::realip::ClientIp;

/// Messages a session may have queued before it counts as lagging.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sess-{}", self.0.simple())
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The client sent a Close frame or dropped the connection.
    ClientClosed,
    /// No inbound frame within two heartbeat intervals.
    HeartbeatTimeout,
    /// The session did not authorize in time.
    AuthorizeTimeout,
    /// The server is shutting down.
    Shutdown,
    /// Closed through [`Session::close`].
    ServerClosed,
    /// The client stopped reading and the outbound queue filled up.
    Lagging,
    /// Transport or protocol error.
    Error,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientClosed => "client_closed",
            Self::HeartbeatTimeout => "heartbeat_timeout",
            Self::AuthorizeTimeout => "authorize_timeout",
            Self::Shutdown => "shutdown",
            Self::ServerClosed => "server_closed",
            Self::Lagging => "lagging",
            Self::Error => "error",
        }
    }

    /// Close frame the server still owes the client, if any.
    pub fn close_frame(&self) -> Option<CloseFrame> {
        let (code, reason) = match self {
            Self::HeartbeatTimeout => (close_code::AWAY, "heartbeat timeout"),
            Self::AuthorizeTimeout => (close_code::POLICY, "authorize timeout"),
            Self::Shutdown => (close_code::AWAY, "server shutdown"),
            Self::Lagging => (close_code::AGAIN, "outbound queue full"),
            Self::ClientClosed | Self::ServerClosed | Self::Error => return None,
        };
        Some(CloseFrame {
            code,
            reason: reason.into(),
        })
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session {0} is closed")]
    Closed(SessionId),

    #[error("session {0} outbound queue is full")]
    Full(SessionId),
}

/// State shared between the session task and application code.
///
/// Outbound messages are queued; the session task owns the socket. A full
/// queue marks the session as lagging and the session task closes it.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    peer_addr: SocketAddr,
    client_ip: String,
    authorized: AtomicBool,
    outbound: mpsc::Sender<Message>,
    lagging: Notify,
    opened_at: Instant,
}

impl Session {
    /// `client_ip` falls back to the peer address when unresolved.
    pub fn new(
        peer_addr: SocketAddr,
        client_ip: ClientIp,
        outbound: mpsc::Sender<Message>,
    ) -> Self {
        let client_ip = if client_ip.is_resolved() {
            client_ip.0
        } else {
            peer_addr.ip().to_canonical().to_string()
        };

        Self {
            id: SessionId::new(),
            peer_addr,
            client_ip,
            authorized: AtomicBool::new(false),
            outbound,
            lagging: Notify::new(),
            opened_at: Instant::now(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Transport peer address (the nearest proxy when behind one).
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Address attributed to the client.
    pub fn client_ip(&self) -> &str {
        &self.client_ip
    }

    /// Mark the session as authorized, cancelling the authorize timeout.
    pub fn authorize(&self) {
        if !self.authorized.swap(true, Ordering::SeqCst) {
            tracing::debug!(session_id = %self.id, "Session authorized");
        }
    }

    pub fn is_authorized(&self) -> bool {
        self.authorized.load(Ordering::SeqCst)
    }

    pub fn uptime(&self) -> Duration {
        self.opened_at.elapsed()
    }

    /// Queue a message for the client without waiting.
    pub fn send(&self, message: Message) -> Result<(), SessionError> {
        match self.outbound.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.lagging.notify_one();
                Err(SessionError::Full(self.id))
            }
            Err(TrySendError::Closed(_)) => Err(SessionError::Closed(self.id)),
        }
    }

    /// Resolves once a send has found the outbound queue full.
    pub async fn lagged(&self) {
        self.lagging.notified().await
    }

    pub fn send_text(&self, text: impl Into<String>) -> Result<(), SessionError> {
        let text: String = text.into();
        self.send(Message::Text(text.into()))
    }

    pub fn send_binary(&self, data: impl Into<Bytes>) -> Result<(), SessionError> {
        self.send(Message::Binary(data.into()))
    }

    /// Close the session with a normal close frame.
    pub fn close(&self) -> Result<(), SessionError> {
        self.send(Message::Close(Some(CloseFrame {
            code: close_code::NORMAL,
            reason: "".into(),
        })))
    }
}
