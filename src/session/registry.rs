//! Registry of open sessions.

use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;

use super::state::{Session, SessionId};

/// Concurrent map of open sessions. Cloning shares the same map.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<SessionId, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: Arc<Session>) {
        self.sessions.insert(session.id(), session);
    }

    pub fn remove(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.remove(id).map(|(_, session)| session)
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|entry| *entry.key()).collect()
    }

    /// Sessions attributed to `client_ip`.
    pub fn by_client_ip(&self, client_ip: &str) -> Vec<Arc<Session>> {
        self.sessions
            .iter()
            .filter(|entry| entry.value().client_ip() == client_ip)
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Queue `message` on every session. Returns how many accepted it; sessions
    /// whose queue is full are skipped and closed by their own task.
    pub fn broadcast(&self, message: &Message) -> usize {
        self.sessions
            .iter()
            .filter(|entry| entry.value().send(message.clone()).is_ok())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realip::ClientIp;
    use crate::session::state::OUTBOUND_QUEUE_CAPACITY;
    use tokio::sync::mpsc;

    fn session(ip: &str) -> (Arc<Session>, mpsc::Receiver<Message>) {
        session_with_capacity(ip, OUTBOUND_QUEUE_CAPACITY)
    }

    fn session_with_capacity(ip: &str, capacity: usize) -> (Arc<Session>, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(capacity);
        let peer = "10.0.0.1:1000".parse().unwrap();
        (Arc::new(Session::new(peer, ClientIp(ip.into()), tx)), rx)
    }

    #[test]
    fn insert_get_remove() {
        let registry = SessionRegistry::new();
        let (s1, _rx1) = session("1.1.1.1");
        let id = s1.id();

        registry.insert(s1);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&id).map(|s| s.id()), Some(id));
        assert_eq!(registry.ids(), vec![id]);

        assert!(registry.remove(&id).is_some());
        assert!(registry.is_empty());
        assert!(registry.get(&id).is_none());
    }

    #[test]
    fn broadcast_skips_closed_sessions() {
        let registry = SessionRegistry::new();
        let (open, mut open_rx) = session("1.1.1.1");
        let (closed, closed_rx) = session("2.2.2.2");
        drop(closed_rx);
        registry.insert(open);
        registry.insert(closed);

        assert_eq!(registry.broadcast(&Message::Text("hi".into())), 1);
        assert_eq!(open_rx.try_recv().unwrap(), Message::Text("hi".into()));
    }

    #[test]
    fn broadcast_skips_full_queues() {
        let registry = SessionRegistry::new();
        let (open, _open_rx) = session("1.1.1.1");
        let (stalled, _stalled_rx) = session_with_capacity("2.2.2.2", 1);
        registry.insert(open);
        registry.insert(stalled);

        assert_eq!(registry.broadcast(&Message::Text("one".into())), 2);
        assert_eq!(registry.broadcast(&Message::Text("two".into())), 1);
    }

    #[test]
    fn lookup_by_client_ip() {
        let registry = SessionRegistry::new();
        let (a, _a) = session("1.1.1.1");
        let (b, _b) = session("1.1.1.1");
        let (c, _c) = session("3.3.3.3");
        registry.insert(a);
        registry.insert(b);
        registry.insert(c);

        assert_eq!(registry.by_client_ip("1.1.1.1").len(), 2);
        assert!(registry.by_client_ip("9.9.9.9").is_empty());
    }
}
