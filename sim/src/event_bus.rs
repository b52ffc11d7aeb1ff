//! Per-game outbound event queue.
//!
//! There is no process-wide event hub: each [`Game`](crate::game::Game)
//! owns one `EventBus` and drains it once per tick into outbound wire
//! frames. Components push typed events onto the bus as they happen during
//! simulation; nothing subscribes mid-tick.

use protocol::{AckId, OutboundItem};
use serde_json::Value;

/// One event queued for delivery this tick, before it's addressed to any
/// particular session.
pub struct QueuedEvent {
    pub name: &'static str,
    pub data: Value,
}

#[derive(Default)]
pub struct EventBus {
    pending: Vec<QueuedEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &'static str, data: Value) {
        self.pending.push(QueuedEvent { name, data });
    }

    pub fn push_serde<T: serde::Serialize>(&mut self, name: &'static str, value: &T) {
        self.push(name, protocol::to_data(value));
    }

    /// Drains all queued events, consuming them into [`OutboundItem`]s with
    /// no ack correlation (broadcasts never need one).
    pub fn drain(&mut self) -> Vec<OutboundItem> {
        std::mem::take(&mut self.pending)
            .into_iter()
            .map(|event| OutboundItem::event(event.name, event.data, None))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Marker used by callers that need to correlate a queued event with an
/// ack id for a single recipient rather than a broadcast.
pub fn event_with_ack(name: &'static str, data: Value, ack_id: AckId) -> OutboundItem {
    OutboundItem::event(name, data, Some(ack_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_empties_the_queue() {
        let mut bus = EventBus::new();
        bus.push("round:new", Value::Null);
        bus.push("position", Value::Null);
        assert_eq!(bus.drain().len(), 2);
        assert!(bus.is_empty());
        assert!(bus.drain().is_empty());
    }
}
