//! Connection registry.
//!
//! Tracks live connections and when each was last heard from. A connection
//! exists here from the moment the socket is accepted; whether it has a
//! Player is the world's business, not the registry's.

use std::collections::HashMap;
use std::time::{Duration, Instant};

pub type ConnectionId = u32;

#[derive(Debug, Clone, Copy)]
pub struct Session {
    pub connected_at: Instant,
    pub last_seen: Instant,
}

#[derive(Debug)]
pub struct ConnectionRegistry {
    sessions: HashMap<ConnectionId, Session>,
    next_id: ConnectionId,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            next_id: 1,
        }
    }

    /// Register a new connection and return its id. Ids are never reused.
    pub fn connect(&mut self, now: Instant) -> ConnectionId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.sessions.insert(
            id,
            Session {
                connected_at: now,
                last_seen: now,
            },
        );
        id
    }

    /// Returns false if the connection was already gone.
    pub fn disconnect(&mut self, id: ConnectionId) -> bool {
        self.sessions.remove(&id).is_some()
    }

    /// Record inbound traffic. Returns false for unknown (stale) ids.
    pub fn touch(&mut self, id: ConnectionId, now: Instant) -> bool {
        match self.sessions.get_mut(&id) {
            Some(session) => {
                session.last_seen = now;
                true
            }
            None => false,
        }
    }

    pub fn is_connected(&self, id: ConnectionId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn session(&self, id: ConnectionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// Connections silent for longer than `timeout`, in id order.
    pub fn idle(&self, now: Instant, timeout: Duration) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self
            .sessions
            .iter()
            .filter(|(_, s)| now.saturating_duration_since(s.last_seen) > timeout)
            .map(|(&id, _)| id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
