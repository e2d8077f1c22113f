//! The single event stream that owns the message log and the registry.
//!
//! Sessions never touch shared state directly. They send commands to the hub
//! task, which applies them one at a time, so append, register and unregister
//! never race each other and need no locks.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::broadcast;
use crate::error::{RelayError, Result};
use crate::log::MessageLog;
use crate::registry::{ConnectionId, ConnectionRegistry, Outbox};
use crate::types::{Candidate, ServerEvent};

#[derive(Debug)]
enum Command {
    Join { id: ConnectionId, outbox: Outbox },
    Leave { id: ConnectionId },
    Publish { from: ConnectionId, candidate: Candidate },
    Stats { reply: oneshot::Sender<HubStats> },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HubStats {
    pub messages: usize,
    pub connections: usize,
}

/// Cloneable entry point into the hub.
#[derive(Debug, Clone)]
pub struct HubHandle {
    commands: mpsc::UnboundedSender<Command>,
    next_id: Arc<AtomicU64>,
}

impl HubHandle {
    /// Registers `outbox` and queues the backlog snapshot as its first event.
    pub fn join(&self, outbox: Outbox) -> Result<ConnectionId> {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.send(Command::Join { id, outbox })?;
        Ok(id)
    }

    /// Safe to call more than once.
    pub fn leave(&self, id: ConnectionId) {
        let _ = self.send(Command::Leave { id });
    }

    /// Appends and broadcasts. Applied even if `from` leaves before the hub gets to it.
    pub fn publish(&self, from: ConnectionId, candidate: Candidate) -> Result<()> {
        self.send(Command::Publish { from, candidate })
    }

    pub async fn stats(&self) -> Result<HubStats> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Stats { reply })?;
        rx.await.map_err(|_| RelayError::HubClosed)
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands.send(command).map_err(|_| RelayError::HubClosed)
    }
}

pub struct Hub {
    log: MessageLog,
    registry: ConnectionRegistry,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl Hub {
    /// Starts the hub task. It runs until every handle is dropped.
    pub fn spawn(log: MessageLog) -> HubHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let hub = Hub {
            log,
            registry: ConnectionRegistry::new(),
            commands: rx,
        };
        tokio::spawn(hub.run());

        HubHandle {
            commands: tx,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            self.apply(command);
        }
        debug!("hub stopped");
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Join { id, outbox } => {
                let backlog = self.log.snapshot();
                let count = backlog.len();
                if outbox.send(ServerEvent::Messages(backlog)).is_err() {
                    debug!(conn = %id, "connection gone before backlog was sent");
                    return;
                }
                self.registry.register(id, outbox);
                info!(conn = %id, backlog = count, online = self.registry.len(), "joined");
            }
            Command::Leave { id } => {
                if self.registry.unregister(id) {
                    info!(conn = %id, online = self.registry.len(), "left");
                }
            }
            Command::Publish { from, candidate } => {
                let message = self.log.append(candidate);
                debug!(conn = %from, message_id = %message.id, kind = message.kind.as_str(), "appended");
                broadcast::publish(&self.registry, &message);
            }
            Command::Stats { reply } => {
                let _ = reply.send(HubStats {
                    messages: self.log.len(),
                    connections: self.registry.len(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Message, MessageKind};

    fn text(sender: &str, content: &str) -> Candidate {
        Candidate {
            content: content.into(),
            kind: MessageKind::Text,
            sender: sender.into(),
            file_name: None,
            file_size: None,
        }
    }

    fn connect(hub: &HubHandle) -> (ConnectionId, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (hub.join(tx).unwrap(), rx)
    }

    async fn backlog(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<Message> {
        match rx.recv().await {
            Some(ServerEvent::Messages(messages)) => messages,
            other => panic!("expected backlog, got {other:?}"),
        }
    }

    async fn next_message(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Message {
        match rx.recv().await {
            Some(ServerEvent::NewMessage(message)) => message,
            other => panic!("expected newMessage, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn first_event_is_the_backlog() {
        let hub = Hub::spawn(MessageLog::new());
        let (alice, mut alice_rx) = connect(&hub);
        assert!(backlog(&mut alice_rx).await.is_empty());

        for i in 0..3 {
            hub.publish(alice, text("alice", &i.to_string())).unwrap();
        }

        let (_bob, mut bob_rx) = connect(&hub);
        let contents: Vec<_> = backlog(&mut bob_rx).await.into_iter().map(|m| m.content).collect();
        assert_eq!(contents, ["0", "1", "2"]);
    }

    #[tokio::test]
    async fn every_connection_gets_each_publish_once() {
        let hub = Hub::spawn(MessageLog::new());
        let mut conns: Vec<_> = (0..3).map(|_| connect(&hub)).collect();
        for (_, rx) in &mut conns {
            backlog(rx).await;
        }

        let publisher = conns[0].0;
        hub.publish(publisher, text("a", "one")).unwrap();
        hub.publish(publisher, text("a", "two")).unwrap();
        hub.stats().await.unwrap();

        for (_, rx) in &mut conns {
            assert_eq!(next_message(rx).await.content, "one");
            assert_eq!(next_message(rx).await.content, "two");
            assert!(rx.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn publish_survives_publisher_leaving() {
        let hub = Hub::spawn(MessageLog::new());
        let (alice, mut alice_rx) = connect(&hub);
        let (_bob, mut bob_rx) = connect(&hub);
        backlog(&mut alice_rx).await;
        backlog(&mut bob_rx).await;

        hub.publish(alice, text("alice", "bye")).unwrap();
        hub.leave(alice);
        drop(alice_rx);

        assert_eq!(next_message(&mut bob_rx).await.content, "bye");
        let stats = hub.stats().await.unwrap();
        assert_eq!(stats, HubStats { messages: 1, connections: 1 });
    }

    #[tokio::test]
    async fn leave_is_idempotent() {
        let hub = Hub::spawn(MessageLog::new());
        let (id, _rx) = connect(&hub);
        hub.leave(id);
        hub.leave(id);
        hub.leave(ConnectionId(9999));
        assert_eq!(hub.stats().await.unwrap().connections, 0);
    }

    #[tokio::test]
    async fn connection_ids_are_distinct() {
        let hub = Hub::spawn(MessageLog::new());
        let (a, _ra) = connect(&hub);
        let (b, _rb) = connect(&hub);
        assert_ne!(a, b);
    }
}
