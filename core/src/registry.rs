use std::collections::HashMap;
use std::fmt;

use tokio::sync::mpsc;

use crate::types::ServerEvent;

/// Per-connection queue the session drains onto its socket. Unbounded, so a
/// live connection never misses an event; only a closed one does.
pub type Outbox = mpsc::UnboundedSender<ServerEvent>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Currently connected parties and where to reach them.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Outbox>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registering the same id again just refreshes its outbox.
    pub fn register(&mut self, id: ConnectionId, outbox: Outbox) {
        self.connections.insert(id, outbox);
    }

    /// No-op for ids that were never registered or are already gone.
    pub fn unregister(&mut self, id: ConnectionId) -> bool {
        self.connections.remove(&id).is_some()
    }

    pub fn all(&self) -> impl Iterator<Item = (ConnectionId, &Outbox)> {
        self.connections.iter().map(|(id, outbox)| (*id, outbox))
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent() {
        let mut registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.register(ConnectionId(1), tx.clone());
        registry.register(ConnectionId(1), tx);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unregister_unknown_is_noop() {
        let mut registry = ConnectionRegistry::new();
        assert!(!registry.unregister(ConnectionId(7)));

        let (tx, _rx) = mpsc::unbounded_channel();
        registry.register(ConnectionId(7), tx);
        assert!(registry.unregister(ConnectionId(7)));
        assert!(!registry.unregister(ConnectionId(7)));
        assert!(registry.is_empty());
    }

    #[test]
    fn all_reflects_current_state() {
        let mut registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.register(ConnectionId(1), tx.clone());
        registry.register(ConnectionId(2), tx);
        registry.unregister(ConnectionId(1));

        let ids: Vec<_> = registry.all().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![ConnectionId(2)]);
        assert!(registry.contains(ConnectionId(2)));
    }
}
