//! Server-side session registry (§4.E, §J): maps a session id to the live
//! transport's inbound-delivery channel so a POST handler can route a
//! request body to the right dispatcher instance.

use cormcp_transport::InboundEvent;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Concurrent `session_id -> inbound sender` map, shared by the SSE GET and
/// POST handlers of one hosting HTTP application.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: DashMap<String, UnboundedSender<InboundEvent>>,
}

impl SessionManager {
    /// An empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a freshly opened session's inbound sender.
    pub fn insert(&self, session_id: String, inbound_tx: UnboundedSender<InboundEvent>) {
        self.sessions.insert(session_id, inbound_tx);
    }

    /// Remove a session, e.g. when its transport closes.
    pub fn remove(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    /// Forward one decoded message to the session's transport. Returns
    /// `false` if `session_id` is unknown (caller should reply `404`), or if
    /// the session's receiver has already been dropped (caller should reply
    /// `500`, the SSE stream for that session is gone).
    pub fn deliver(&self, session_id: &str, event: InboundEvent) -> DeliveryOutcome {
        match self.sessions.get(session_id) {
            Some(sender) => {
                if sender.send(event).is_ok() {
                    DeliveryOutcome::Delivered
                } else {
                    DeliveryOutcome::SessionGone
                }
            }
            None => DeliveryOutcome::UnknownSession,
        }
    }

    /// Number of currently registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True if there are no registered sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Result of routing an inbound POST body to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    UnknownSession,
    SessionGone,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_session_is_reported() {
        let manager = SessionManager::new();
        let outcome = manager.deliver("nope", InboundEvent::Closed);
        assert_eq!(outcome, DeliveryOutcome::UnknownSession);
    }

    #[test]
    fn delivers_to_registered_session() {
        let manager = SessionManager::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        manager.insert("abc".into(), tx);
        let outcome = manager.deliver("abc", InboundEvent::Closed);
        assert_eq!(outcome, DeliveryOutcome::Delivered);
        assert!(matches!(rx.try_recv(), Ok(InboundEvent::Closed)));
    }

    #[test]
    fn removed_session_is_unknown_again() {
        let manager = SessionManager::new();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        manager.insert("abc".into(), tx);
        manager.remove("abc");
        assert_eq!(
            manager.deliver("abc", InboundEvent::Closed),
            DeliveryOutcome::UnknownSession
        );
    }
}
