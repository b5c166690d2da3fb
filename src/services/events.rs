//! In-process broadcast of engine events.

use chrono::Utc;
use tokio::sync::broadcast;

use crate::domain::{EngineEvent, EventKind};

const CHANNEL_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, kind: EventKind, source: &str, detail: impl Into<String>) {
        let event = EngineEvent {
            kind,
            source: source.to_string(),
            detail: detail.into(),
            at: Utc::now(),
        };
        tracing::debug!(kind = %event.kind, source = %event.source, detail = %event.detail, "Engine event");
        // No subscribers is fine
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.publish(EventKind::Created, "price_items", "Desk");

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, EventKind::Created);
        assert_eq!(event.source, "price_items");
        assert_eq!(event.detail, "Desk");
    }

    #[test]
    fn publishing_without_subscribers_does_not_fail() {
        EventBus::new().publish(EventKind::Deleted, "artifacts", "gone");
    }
}
