//! Application hooks into the session lifecycle.

use std::sync::Arc;

use axum::extract::ws::Message;

use super::state::{CloseReason, Session};

/// Callbacks invoked from the session task.
///
/// Callbacks run inline in the session loop and should not block. Use
/// [`Session::send`] to reply and [`Session::authorize`] once the client has
/// proven who it is; both may also be called later from a spawned task.
pub trait SessionHandler: Send + Sync + 'static {
    fn on_open(&self, _session: &Arc<Session>) {}

    /// Called for every Text and Binary message.
    fn on_message(&self, session: &Arc<Session>, message: Message);

    fn on_close(&self, _session: &Arc<Session>, _reason: CloseReason) {}
}

/// Echoes every message back and treats the first message as authorization.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoHandler;

impl SessionHandler for EchoHandler {
    fn on_message(&self, session: &Arc<Session>, message: Message) {
        session.authorize();
        if let Err(error) = session.send(message) {
            tracing::debug!(session_id = %session.id(), %error, "Echo dropped");
        }
    }
}
