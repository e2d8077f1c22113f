//! Fan-out of accepted messages to every registered connection.

use tracing::debug;

use crate::registry::ConnectionRegistry;
use crate::types::{Message, ServerEvent};

/// Result of one fan-out pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub dropped: usize,
}

/// Enqueues `message` as a `newMessage` event on every registered outbox,
/// including the publisher's. A closed outbox (the session already hung up)
/// loses this one event; nothing is retried and other recipients are unaffected.
pub fn publish(registry: &ConnectionRegistry, message: &Message) -> Delivery {
    let mut delivery = Delivery::default();

    for (id, outbox) in registry.all() {
        if outbox.send(ServerEvent::NewMessage(message.clone())).is_ok() {
            delivery.delivered += 1;
        } else {
            debug!(conn = %id, message_id = %message.id, "outbox closed, dropping event");
            delivery.dropped += 1;
        }
    }

    debug!(
        message_id = %message.id,
        delivered = delivery.delivered,
        dropped = delivery.dropped,
        "broadcast message"
    );
    delivery
}
