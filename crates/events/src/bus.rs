use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::types::{EventEnvelope, RunEvent};

const DEFAULT_CAPACITY: usize = 1024;

/// Fan-out of run events over a tokio broadcast channel.
///
/// Publishing never blocks the run. A subscriber that falls more than the
/// channel capacity behind sees `RecvError::Lagged` and loses the oldest
/// events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
    event_count: Arc<AtomicUsize>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            event_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns how many subscribers received the envelope; 0 when nobody
    /// is listening.
    pub fn publish(&self, envelope: EventEnvelope) -> usize {
        self.event_count.fetch_add(1, Ordering::Relaxed);
        self.sender.send(envelope).unwrap_or(0)
    }

    pub fn emit(&self, event: RunEvent) -> usize {
        self.publish(EventEnvelope::new(event))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn event_count(&self) -> usize {
        self.event_count.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .field("event_count", &self.event_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::RecvError;
    use uuid::Uuid;

    fn iteration(n: u32) -> RunEvent {
        RunEvent::IterationStarted {
            run_id: Uuid::nil(),
            iteration: n,
        }
    }

    #[tokio::test]
    async fn test_emit_reaches_every_subscriber() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        assert_eq!(bus.emit(iteration(1)), 2);

        assert_eq!(rx1.recv().await.unwrap().event, iteration(1));
        assert_eq!(rx2.recv().await.unwrap().event, iteration(1));
    }

    #[tokio::test]
    async fn test_events_arrive_in_publish_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        for n in 1..=3 {
            bus.emit(iteration(n));
        }

        for n in 1..=3 {
            assert_eq!(rx.recv().await.unwrap().event, iteration(n));
        }
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_is_counted() {
        let bus = EventBus::new();
        assert_eq!(bus.emit(iteration(1)), 0);
        assert_eq!(bus.event_count(), 1);
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags() {
        let bus = EventBus::with_capacity(2);
        let mut rx = bus.subscribe();

        for n in 1..=3 {
            bus.emit(iteration(n));
        }

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(1))));
        assert_eq!(rx.recv().await.unwrap().event, iteration(2));
    }

    #[test]
    fn test_clones_share_channel() {
        let bus = EventBus::new();
        let other = bus.clone();

        let _rx = other.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        other.emit(iteration(1));
        assert_eq!(bus.event_count(), 1);
    }
}
